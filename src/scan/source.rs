//! Contract data source boundary.
//!
//! The scanner only depends on this trait; the upstream provider is an
//! external collaborator returning paginated, idempotent records.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::SourceError;
use crate::types::{Contract, EntityId};

/// Filter for a scan run: a date range, optionally narrowed by agency and
/// minimum award amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractFilter {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub agency: Option<String>,
    pub min_amount: Option<f64>,
}

impl ContractFilter {
    pub fn date_range(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            agency: None,
            min_amount: None,
        }
    }

    /// Builder-style method to narrow by awarding agency.
    pub fn with_agency(mut self, agency: impl Into<String>) -> Self {
        self.agency = Some(agency.into());
        self
    }

    /// Builder-style method to set a minimum award amount.
    pub fn with_min_amount(mut self, min_amount: f64) -> Self {
        self.min_amount = Some(min_amount);
        self
    }

    /// Reject filters no source could serve.
    pub fn validate(&self) -> Result<(), String> {
        if self.end_date < self.start_date {
            return Err(format!(
                "end date {} precedes start date {}",
                self.end_date, self.start_date
            ));
        }
        if let Some(min) = self.min_amount {
            if min < 0.0 {
                return Err(format!("negative minimum amount {min}"));
            }
        }
        if let Some(agency) = &self.agency {
            if agency.trim().is_empty() {
                return Err("agency filter is empty".into());
            }
        }
        Ok(())
    }
}

/// One page of contracts from the source.
#[derive(Debug, Clone)]
pub struct ContractPage {
    pub contracts: Vec<Contract>,
    pub page: u32,
    pub has_next: bool,
}

/// Paginated, read-only access to contract award data.
///
/// Implementations classify failures as retryable (network, 5xx) or
/// terminal (4xx, malformed filter) via [`SourceError`]. Fetching the same
/// page twice for the same filter must yield the same logical records.
#[async_trait]
pub trait ContractSource: Send + Sync {
    /// Fetch one page of contracts matching `filter`. Pages are 1-based.
    async fn fetch_page(
        &self,
        filter: &ContractFilter,
        page: u32,
    ) -> Result<ContractPage, SourceError>;

    /// All known awards to one recipient, for history-based detectors.
    async fn recipient_history(&self, id: &EntityId) -> Result<Vec<Contract>, SourceError>;
}
