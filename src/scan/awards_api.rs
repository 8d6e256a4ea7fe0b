//! HTTP-backed contract source for a USASpending-style awards API.
//!
//! Transient server errors (502/503/504) are retried with exponential
//! backoff before the scanner ever sees them; everything else is classified
//! per [`SourceError`]. Records that do not convert into a valid
//! [`Contract`] are skipped and logged, never fatal to the page.

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

use super::{ContractFilter, ContractPage, ContractSource};
use crate::errors::SourceError;
use crate::logging::targets;
use crate::types::{CompetitionType, Contract, ContractId, EntityId, Modification};

/// HTTP status codes that indicate transient server errors (retryable
/// before classification).
const RETRYABLE_STATUS_CODES: &[u16] = &[502, 503, 504];

/// Maximum retry attempts for transient errors.
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds (doubles with each retry).
const INITIAL_BACKOFF_MS: u64 = 100;

#[derive(Debug, Clone)]
pub struct AwardsApiClient {
    client: Client,
    base_url: String,
    page_size: u32,
}

#[derive(Deserialize, Debug)]
struct SearchResponse {
    results: Vec<AwardRecord>,
    page_metadata: PageMetadata,
}

#[derive(Deserialize, Debug)]
struct PageMetadata {
    page: u32,
    #[serde(rename = "hasNext")]
    has_next: bool,
}

#[derive(Deserialize, Debug)]
struct AwardRecord {
    award_id: String,
    awarding_agency: String,
    recipient_uei: String,
    total_obligation: f64,
    award_date: String,
    period_of_performance_start: Option<String>,
    period_of_performance_end: Option<String>,
    #[serde(default)]
    sole_source: bool,
    #[serde(default)]
    number_of_offers: u32,
    #[serde(default)]
    modifications: Vec<ModificationRecord>,
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ModificationRecord {
    number: u32,
    date: String,
    amount: f64,
}

impl AwardsApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            page_size: 100,
        }
    }

    /// Builder-style method to override the page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// POST with automatic retry for transient server errors.
    async fn post(&self, path: &str, body: serde_json::Value) -> Result<String, SourceError> {
        let url = format!("{}{path}", self.base_url);
        let payload =
            serde_json::to_string(&body).map_err(|e| SourceError::Terminal(e.to_string()))?;

        for attempt in 0..=MAX_RETRIES {
            let response = self
                .client
                .post(&url)
                .header("Content-Type", "application/json")
                .body(payload.clone())
                .send()
                .await
                .map_err(|e| SourceError::Retryable(e.to_string()))?;

            let status = response.status().as_u16();
            if RETRYABLE_STATUS_CODES.contains(&status) && attempt < MAX_RETRIES {
                let backoff = Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt));
                warn!(
                    target: targets::SCAN,
                    status,
                    attempt = attempt + 1,
                    max_attempts = MAX_RETRIES + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    path,
                    "retryable HTTP error, backing off"
                );
                tokio::time::sleep(backoff).await;
                continue;
            }

            let text = response
                .text()
                .await
                .map_err(|e| SourceError::Retryable(e.to_string()))?;
            if status < 400 {
                return Ok(text);
            }
            return Err(SourceError::from_status(status, &text));
        }

        Err(SourceError::Retryable(format!(
            "max retries ({MAX_RETRIES}) exceeded for {path}"
        )))
    }

    async fn search(&self, body: serde_json::Value) -> Result<SearchResponse, SourceError> {
        let text = self.post("/search/awards", body).await?;
        serde_json::from_str(&text)
            .map_err(|e| SourceError::Terminal(format!("malformed search response: {e}")))
    }
}

#[async_trait::async_trait]
impl ContractSource for AwardsApiClient {
    async fn fetch_page(
        &self,
        filter: &ContractFilter,
        page: u32,
    ) -> Result<ContractPage, SourceError> {
        let mut filters = json!({
            "time_period": [{
                "start_date": filter.start_date.to_string(),
                "end_date": filter.end_date.to_string(),
            }],
        });
        if let Some(agency) = &filter.agency {
            filters["agencies"] = json!([{ "type": "awarding", "name": agency }]);
        }
        if let Some(min) = filter.min_amount {
            filters["award_amounts"] = json!([{ "lower_bound": min }]);
        }

        let response = self
            .search(json!({
                "filters": filters,
                "page": page,
                "limit": self.page_size,
            }))
            .await?;

        let mut contracts = Vec::with_capacity(response.results.len());
        let mut skipped = 0usize;
        for record in response.results {
            match convert_record(record) {
                Some(contract) => contracts.push(contract),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(
                target: targets::SCAN,
                page,
                skipped,
                "skipped malformed award records"
            );
        }

        Ok(ContractPage {
            contracts,
            page: response.page_metadata.page,
            has_next: response.page_metadata.has_next,
        })
    }

    async fn recipient_history(&self, id: &EntityId) -> Result<Vec<Contract>, SourceError> {
        let response = self
            .search(json!({
                "filters": { "recipient_uei": id.as_str() },
                "page": 1,
                "limit": self.page_size,
            }))
            .await?;
        Ok(response
            .results
            .into_iter()
            .filter_map(convert_record)
            .collect())
    }
}

fn convert_record(record: AwardRecord) -> Option<Contract> {
    if record.award_id.trim().is_empty() || record.total_obligation < 0.0 {
        return None;
    }
    let recipient_id = EntityId::new(&record.recipient_uei);
    if recipient_id.is_empty() {
        return None;
    }
    let award_date = parse_date(&record.award_date)?;

    let mut modifications = Vec::with_capacity(record.modifications.len());
    for m in record.modifications {
        modifications.push(Modification {
            number: m.number,
            date: parse_date(&m.date)?,
            amount_delta: m.amount,
        });
    }
    modifications.sort_by_key(|m| m.number);

    Some(Contract {
        id: ContractId::new(record.award_id.trim()),
        agency: record.awarding_agency,
        recipient_id,
        amount: record.total_obligation,
        award_date,
        period_start: record
            .period_of_performance_start
            .as_deref()
            .and_then(parse_date),
        period_end: record
            .period_of_performance_end
            .as_deref()
            .and_then(parse_date),
        competition: if record.sole_source {
            CompetitionType::SoleSource
        } else {
            CompetitionType::Competed
        },
        offers_received: record.number_of_offers,
        modifications,
        description: record.description,
    })
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}
