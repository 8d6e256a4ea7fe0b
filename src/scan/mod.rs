//! Batch scanner: fetch, resolve, detect, aggregate, report.
//!
//! The scanner drives the pipeline over thousands of contracts under a
//! bounded worker pool, with a shared rate limiter gating every outbound
//! call to the upstream source. The entity index is read-only for the
//! whole run and shared by all workers; results are accumulated and
//! sorted exactly once at report-assembly time, so completion order never
//! leaks into the report.

mod awards_api;
mod forward;
mod rate_limit;
mod report;
mod source;

#[cfg(test)]
mod tests;

pub use awards_api::AwardsApiClient;
pub use forward::{ForwardOutcome, InvestigationBundle, Investigator};
pub use rate_limit::RateLimiter;
pub use report::{PageGap, ScanReport, TierCounts};
pub use source::{ContractFilter, ContractPage, ContractSource};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::detect::{run_suite, Detector, DetectorContext};
use crate::errors::{ScanError, SourceError};
use crate::index::{EntityIndex, ExclusionList};
use crate::logging::targets;
use crate::score::{aggregate, RiskAssessment};
use crate::types::{Contract, Entity, EntityId};

/// Retry attempts for one page fetch before recording a gap.
const MAX_PAGE_RETRIES: u32 = 3;

/// Initial page-retry backoff in milliseconds (doubles with each retry).
const INITIAL_PAGE_BACKOFF_MS: u64 = 100;

/// Cooperative cancellation handle for a running scan.
///
/// After `cancel()`, no new pages are fetched and no new analyses are
/// dispatched; in-flight analyses finish and their assessments are kept.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// In-flight analysis gauge; the peak feeds the report.
#[derive(Debug, Default)]
struct InFlightGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlightGauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Read-only state shared by every analysis worker.
struct AnalysisShared<S> {
    source: Arc<S>,
    entities: Option<Arc<EntityIndex>>,
    exclusions: Arc<ExclusionList>,
    suite: Vec<Detector>,
    config: ScanConfig,
    rate: Arc<RateLimiter>,
    history_cache: Mutex<HashMap<EntityId, Arc<Vec<Contract>>>>,
    history_failures: AtomicU64,
    gauge: InFlightGauge,
}

struct AnalysisOutcome {
    contract: Contract,
    entity: Option<Entity>,
    assessment: RiskAssessment,
}

/// Orchestrates scan runs against a contract source.
pub struct BatchScanner<S, I> {
    source: Arc<S>,
    investigator: Arc<I>,
    /// `None` runs the scan degraded: every lookup resolves to NotFound.
    entities: Option<Arc<EntityIndex>>,
    exclusions: Arc<ExclusionList>,
    config: ScanConfig,
    cancel: CancelFlag,
}

impl<S, I> BatchScanner<S, I>
where
    S: ContractSource + 'static,
    I: Investigator + 'static,
{
    pub fn new(
        source: Arc<S>,
        investigator: Arc<I>,
        entities: Option<Arc<EntityIndex>>,
        exclusions: Arc<ExclusionList>,
        config: ScanConfig,
    ) -> Self {
        if entities.is_none() {
            warn!(
                target: targets::SCAN,
                "entity index unavailable, scanning in degraded mode"
            );
        }
        Self {
            source,
            investigator,
            entities,
            exclusions,
            config,
            cancel: CancelFlag::new(),
        }
    }

    /// Handle for cancelling this scanner's runs from another task.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run a full scan for `filter`.
    ///
    /// Per-page and per-record failures degrade and are recorded in the
    /// report; only an unservable filter or a terminal source failure
    /// before any work fails the scan itself.
    pub async fn scan(&self, filter: ContractFilter) -> Result<ScanReport, ScanError> {
        filter.validate().map_err(ScanError::InvalidFilter)?;
        let started_at = Utc::now();

        let shared = Arc::new(AnalysisShared {
            source: Arc::clone(&self.source),
            entities: self.entities.clone(),
            exclusions: Arc::clone(&self.exclusions),
            suite: Detector::suite(&self.config.detectors),
            config: self.config.clone(),
            rate: Arc::new(RateLimiter::new(&self.config.rate)),
            history_cache: Mutex::new(HashMap::new()),
            history_failures: AtomicU64::new(0),
            gauge: InFlightGauge::default(),
        });
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut analyses: JoinSet<AnalysisOutcome> = JoinSet::new();

        let mut page_gaps = Vec::new();
        let mut cancelled = false;
        let mut page = 1u32;
        let mut consecutive_gaps = 0u32;
        let mut fetched_any = false;

        info!(
            target: targets::SCAN,
            start = %filter.start_date,
            end = %filter.end_date,
            agency = filter.agency.as_deref().unwrap_or("*"),
            concurrency = self.config.concurrency,
            "scan started"
        );

        'pages: loop {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            match self.fetch_page_with_retry(&filter, page, &shared.rate).await {
                Ok(page_data) => {
                    consecutive_gaps = 0;
                    fetched_any = true;
                    debug!(
                        target: targets::SCAN,
                        page,
                        contracts = page_data.contracts.len(),
                        has_next = page_data.has_next,
                        "page fetched"
                    );

                    for contract in page_data.contracts {
                        if self.cancel.is_cancelled() {
                            cancelled = true;
                            break 'pages;
                        }
                        // Capacity is taken before spawning, so at most
                        // `concurrency` analyses ever exist at once.
                        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                            break 'pages;
                        };
                        let shared = Arc::clone(&shared);
                        analyses.spawn(async move {
                            let _permit = permit;
                            shared.gauge.enter();
                            let outcome = analyze_contract(&shared, contract).await;
                            shared.gauge.exit();
                            outcome
                        });
                    }

                    if !page_data.has_next {
                        break;
                    }
                    page += 1;
                }
                Err(e) => {
                    let terminal = !e.is_retryable();
                    if terminal && !fetched_any {
                        return Err(ScanError::Source(e));
                    }
                    warn!(
                        target: targets::SCAN,
                        page,
                        error = %e,
                        "page unfetchable, recording gap"
                    );
                    page_gaps.push(PageGap {
                        page,
                        error: e.to_string(),
                    });
                    if terminal {
                        break;
                    }
                    consecutive_gaps += 1;
                    if consecutive_gaps > self.config.max_consecutive_page_gaps {
                        warn!(
                            target: targets::SCAN,
                            consecutive_gaps,
                            "too many consecutive page gaps, stopping fetch"
                        );
                        break;
                    }
                    page += 1;
                }
            }
        }

        // Drain analyses; forward high-severity results as they land.
        let mut assessments = Vec::new();
        let mut tier_counts = TierCounts::default();
        let mut forwards: JoinSet<ForwardOutcome> = JoinSet::new();
        while let Some(joined) = analyses.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(target: targets::SCAN, error = %e, "analysis task failed");
                    continue;
                }
            };
            tier_counts.record(outcome.assessment.tier);
            if outcome.assessment.tier >= self.config.forward_tier
                && outcome.assessment.is_flagged()
            {
                let investigator = Arc::clone(&self.investigator);
                let forward_config = self.config.forward.clone();
                let bundle = InvestigationBundle {
                    contract: outcome.contract.clone(),
                    entity: outcome.entity.clone(),
                    assessment: outcome.assessment.clone(),
                };
                forwards.spawn(async move {
                    forward::forward_with_retry(&*investigator, bundle, &forward_config).await
                });
            }
            assessments.push(outcome.assessment);
        }

        let mut forwarded = 0u64;
        let mut deferred_forwards = 0u64;
        while let Some(joined) = forwards.join_next().await {
            match joined {
                Ok(ForwardOutcome::Delivered { .. }) => forwarded += 1,
                Ok(ForwardOutcome::Deferred { .. }) => deferred_forwards += 1,
                Err(e) => {
                    warn!(target: targets::FORWARD, error = %e, "forward task failed");
                    deferred_forwards += 1;
                }
            }
        }

        let total_scanned = assessments.len() as u64;
        let mut flagged: Vec<RiskAssessment> =
            assessments.into_iter().filter(|a| a.is_flagged()).collect();
        // The only ordering guarantee: one final sort after all work.
        flagged.sort_by(|a, b| {
            b.tier
                .cmp(&a.tier)
                .then_with(|| {
                    b.score
                        .partial_cmp(&a.score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.contract_id.cmp(&b.contract_id))
        });

        let report = ScanReport {
            total_scanned,
            tier_counts,
            flagged,
            page_gaps,
            history_fetch_failures: shared.history_failures.load(Ordering::SeqCst),
            forwarded,
            deferred_forwards,
            peak_concurrency: shared.gauge.peak(),
            cancelled,
            started_at,
            finished_at: Utc::now(),
        };
        info!(target: targets::SCAN, summary = %report.summary(), "scan complete");
        Ok(report)
    }

    async fn fetch_page_with_retry(
        &self,
        filter: &ContractFilter,
        page: u32,
        rate: &RateLimiter,
    ) -> Result<ContractPage, SourceError> {
        let mut last_error = None;
        for attempt in 0..=MAX_PAGE_RETRIES {
            rate.acquire().await;
            match self.source.fetch_page(filter, page).await {
                Ok(page_data) => return Ok(page_data),
                Err(e) if e.is_retryable() && attempt < MAX_PAGE_RETRIES => {
                    let backoff =
                        Duration::from_millis(INITIAL_PAGE_BACKOFF_MS * 2u64.pow(attempt));
                    warn!(
                        target: targets::SCAN,
                        page,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "page fetch failed, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error
            .unwrap_or_else(|| SourceError::Retryable(format!("page {page} retries exhausted"))))
    }
}

/// One contract through resolve -> history -> detect -> aggregate.
async fn analyze_contract<S: ContractSource>(
    shared: &AnalysisShared<S>,
    contract: Contract,
) -> AnalysisOutcome {
    let entity = shared
        .entities
        .as_ref()
        .and_then(|index| index.lookup(&contract.recipient_id).cloned());
    let cluster_size = shared
        .entities
        .as_ref()
        .and_then(|index| index.cluster_size(&contract.recipient_id));

    let history = recipient_history(shared, &contract.recipient_id).await;

    let ctx = DetectorContext {
        contract: &contract,
        entity: entity.as_ref(),
        exclusions: shared.exclusions.as_ref(),
        history: &history[..],
        cluster_size,
    };
    let signals = run_suite(&shared.suite, &ctx);
    let assessment = aggregate(
        contract.id.clone(),
        signals,
        entity.is_none(),
        &shared.config.aggregator,
    );

    AnalysisOutcome {
        contract,
        entity,
        assessment,
    }
}

/// Recipient history, fetched at most once per entity per run.
///
/// Concurrent first requests for one entity may race into a duplicate
/// fetch; the source is idempotent so both observe the same records. A
/// failed fetch degrades history-based detectors to no-signal for this
/// contract and is counted in the report.
async fn recipient_history<S: ContractSource>(
    shared: &AnalysisShared<S>,
    id: &EntityId,
) -> Arc<Vec<Contract>> {
    if let Some(history) = shared.history_cache.lock().await.get(id) {
        return Arc::clone(history);
    }

    shared.rate.acquire().await;
    let history = match shared.source.recipient_history(id).await {
        Ok(history) => Arc::new(history),
        Err(e) => {
            shared.history_failures.fetch_add(1, Ordering::SeqCst);
            warn!(
                target: targets::SCAN,
                recipient = %id,
                error = %e,
                "recipient history unavailable, degrading history detectors"
            );
            Arc::new(Vec::new())
        }
    };
    shared
        .history_cache
        .lock()
        .await
        .entry(id.clone())
        .or_insert_with(|| Arc::clone(&history));
    Arc::clone(&history)
}
