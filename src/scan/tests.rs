//! Integration tests for the full scan pipeline: in-memory source and
//! investigator driving fetch -> resolve -> detect -> aggregate -> report.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::*;
use crate::config::ScanConfig;
use crate::detect::testutil::{contract, date, entity};
use crate::errors::ForwardError;
use crate::types::{CompetitionType, Entity, EntityId, ExclusionRecord, Severity};

/// In-memory contract source with scriptable failures.
#[derive(Default)]
struct MockSource {
    /// 1-based pages of contracts.
    pages: Vec<Vec<Contract>>,
    /// Pages that fail on every fetch attempt.
    failing_pages: HashMap<u32, SourceError>,
    histories: HashMap<EntityId, Vec<Contract>>,
    /// Entities whose history fetch fails.
    failing_histories: Vec<EntityId>,
    /// Delay injected into each history fetch, to create overlap.
    history_delay: Duration,
    /// Cancel this flag when the given page is fetched.
    cancel_on_page: Option<(u32, CancelFlag)>,
    fetch_calls: AtomicU32,
}

impl MockSource {
    fn with_pages(pages: Vec<Vec<Contract>>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    /// History = every contract in every page, grouped by recipient.
    fn index_histories(mut self) -> Self {
        let mut histories: HashMap<EntityId, Vec<Contract>> = HashMap::new();
        for page in &self.pages {
            for c in page {
                histories
                    .entry(c.recipient_id.clone())
                    .or_default()
                    .push(c.clone());
            }
        }
        self.histories = histories;
        self
    }
}

#[async_trait]
impl ContractSource for MockSource {
    async fn fetch_page(
        &self,
        _filter: &ContractFilter,
        page: u32,
    ) -> Result<ContractPage, SourceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some((cancel_page, flag)) = &self.cancel_on_page {
            if page == *cancel_page {
                flag.cancel();
            }
        }
        if let Some(error) = self.failing_pages.get(&page) {
            return Err(error.clone());
        }
        let idx = (page - 1) as usize;
        let contracts = self.pages.get(idx).cloned().unwrap_or_default();
        Ok(ContractPage {
            contracts,
            page,
            has_next: idx + 1 < self.pages.len(),
        })
    }

    async fn recipient_history(&self, id: &EntityId) -> Result<Vec<Contract>, SourceError> {
        if !self.history_delay.is_zero() {
            tokio::time::sleep(self.history_delay).await;
        }
        if self.failing_histories.contains(id) {
            return Err(SourceError::Retryable("history backend down".into()));
        }
        Ok(self.histories.get(id).cloned().unwrap_or_default())
    }
}

/// Investigator recording received bundles, optionally failing deliveries.
#[derive(Default)]
struct MockInvestigator {
    received: std::sync::Mutex<Vec<InvestigationBundle>>,
    fail_always: bool,
}

#[async_trait]
impl Investigator for MockInvestigator {
    async fn investigate(&self, bundle: InvestigationBundle) -> Result<(), ForwardError> {
        if self.fail_always {
            return Err(ForwardError::Delivery("investigator offline".into()));
        }
        self.received.lock().unwrap().push(bundle);
        Ok(())
    }
}

fn exclusion(id: &str, effective: &str) -> ExclusionRecord {
    ExclusionRecord {
        entity_id: EntityId::new(id),
        effective: date(effective),
        termination: None,
        program: "Procurement".into(),
        excluding_agency: "GSA".into(),
    }
}

fn index_of(entities: Vec<Entity>) -> Option<Arc<EntityIndex>> {
    Some(Arc::new(EntityIndex::from_entities(entities)))
}

fn fast_config() -> ScanConfig {
    let mut config = ScanConfig::default().with_rate(10_000.0);
    config.forward.initial_backoff_ms = 1;
    config
}

fn filter() -> ContractFilter {
    ContractFilter::date_range(date("2024-01-01"), date("2024-12-31"))
}

fn scanner(
    source: MockSource,
    investigator: MockInvestigator,
    entities: Option<Arc<EntityIndex>>,
    exclusions: Vec<ExclusionRecord>,
    config: ScanConfig,
) -> BatchScanner<MockSource, MockInvestigator> {
    BatchScanner::new(
        Arc::new(source),
        Arc::new(investigator),
        entities,
        Arc::new(ExclusionList::from_records(exclusions)),
        config,
    )
}

#[tokio::test]
async fn test_scan_flags_excluded_recipient_and_forwards() {
    let excluded = entity("EXCL00000001", "DEBARRED LLC", Some("2015-01-01"));
    let clean = entity("CLEAN0000001", "HONEST INC", Some("2010-05-01"));
    let source = MockSource::with_pages(vec![vec![
        contract("C-BAD", "EXCL00000001", 500_000.0, "2024-03-06"),
        contract("C-OK", "CLEAN0000001", 80_000.0, "2024-03-06"),
    ]])
    .index_histories();
    let investigator = Arc::new(MockInvestigator::default());

    let scanner = BatchScanner::new(
        Arc::new(source),
        Arc::clone(&investigator),
        index_of(vec![excluded, clean]),
        Arc::new(ExclusionList::from_records(vec![exclusion(
            "EXCL00000001",
            "2020-01-01",
        )])),
        fast_config(),
    );

    let report = scanner.scan(filter()).await.unwrap();
    assert_eq!(report.total_scanned, 2);
    assert_eq!(report.tier_counts.critical, 1);
    assert_eq!(report.forwarded, 1);
    assert_eq!(report.deferred_forwards, 0);
    assert!(!report.cancelled);

    let critical = &report.flagged[0];
    assert_eq!(critical.contract_id.as_str(), "C-BAD");
    assert_eq!(critical.tier, Severity::Critical);

    let received = investigator.received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].assessment.contract_id.as_str(), "C-BAD");
    assert_eq!(
        received[0].entity.as_ref().unwrap().legal_name,
        "DEBARRED LLC"
    );
}

#[tokio::test]
async fn test_exclusion_requires_exact_identifier_not_name() {
    // "NATIVE HEALTH" shares a name fragment with the excluded
    // "ALTERNATIVE HEALTH CARE SERVICE" but has a different identifier.
    let native = entity("NATIVE000001", "NATIVE HEALTH", Some("2012-01-01"));
    let source = MockSource::with_pages(vec![vec![contract(
        "C-1",
        "NATIVE000001",
        250_000.0,
        "2024-03-06",
    )]])
    .index_histories();

    let scanner = scanner(
        source,
        MockInvestigator::default(),
        index_of(vec![native]),
        vec![exclusion("ALTHC0000001", "2020-01-01")],
        fast_config(),
    );

    let report = scanner.scan(filter()).await.unwrap();
    assert_eq!(report.tier_counts.critical, 0);
    assert!(report
        .flagged
        .iter()
        .all(|a| a.tier < Severity::Critical));
}

#[tokio::test]
async fn test_scan_is_idempotent_on_frozen_input() {
    let shared_entity = entity("AAA111BBB222", "REPEAT LLC", Some("2024-01-01"));
    let pages = vec![vec![
        contract("C-1", "AAA111BBB222", 9_800.0, "2024-03-01"),
        contract("C-2", "AAA111BBB222", 9_700.0, "2024-03-11"),
    ]];

    let mut reports = Vec::new();
    for _ in 0..2 {
        let source = MockSource::with_pages(pages.clone()).index_histories();
        let scanner = scanner(
            source,
            MockInvestigator::default(),
            index_of(vec![shared_entity.clone()]),
            vec![],
            fast_config(),
        );
        reports.push(scanner.scan(filter()).await.unwrap());
    }

    let (a, b) = (&reports[0], &reports[1]);
    assert_eq!(a.total_scanned, b.total_scanned);
    assert_eq!(a.tier_counts, b.tier_counts);
    assert_eq!(a.flagged.len(), b.flagged.len());
    for (x, y) in a.flagged.iter().zip(&b.flagged) {
        assert_eq!(x.contract_id, y.contract_id);
        assert_eq!(x.score, y.score);
        assert_eq!(x.tier, y.tier);
        assert_eq!(x.signals, y.signals);
    }
}

#[tokio::test]
async fn test_threshold_splitting_scenario_end_to_end() {
    // $9,800 and $9,700 to one entity 10 days apart fire; an unrelated
    // single $9,800 award does not.
    let splitter = entity("SPLIT0000001", "SPLITTER LLC", Some("2018-01-01"));
    let single = entity("SINGLE000001", "ONE AWARD INC", Some("2018-01-01"));
    let source = MockSource::with_pages(vec![vec![
        contract("C-1", "SPLIT0000001", 9_800.0, "2024-03-01"),
        contract("C-2", "SPLIT0000001", 9_700.0, "2024-03-11"),
        contract("C-3", "SINGLE000001", 9_800.0, "2024-03-01"),
    ]])
    .index_histories();

    let scanner = scanner(
        source,
        MockInvestigator::default(),
        index_of(vec![splitter, single]),
        vec![],
        fast_config(),
    );

    let report = scanner.scan(filter()).await.unwrap();
    let flagged_ids: Vec<&str> = report
        .flagged
        .iter()
        .filter(|a| a.tier == Severity::High)
        .map(|a| a.contract_id.as_str())
        .collect();
    assert!(flagged_ids.contains(&"C-1"));
    assert!(flagged_ids.contains(&"C-2"));
    assert!(!flagged_ids.contains(&"C-3"));
}

#[tokio::test]
async fn test_degraded_mode_without_entity_index() {
    let mut sole_source = contract("C-1", "AAA111BBB222", 100_000.0, "2024-03-06");
    sole_source.competition = CompetitionType::SoleSource;
    let source = MockSource::with_pages(vec![vec![sole_source]]).index_histories();

    let scanner = scanner(
        source,
        MockInvestigator::default(),
        None,
        vec![exclusion("AAA111BBB222", "2020-01-01")],
        fast_config(),
    );

    let report = scanner.scan(filter()).await.unwrap();
    assert_eq!(report.total_scanned, 1);
    // Contract-only detectors still run...
    assert_eq!(report.flagged.len(), 1);
    assert!(report.flagged[0].entity_unresolved);
    // ...but entity-dependent ones (including exclusion) stay silent.
    assert_eq!(report.tier_counts.critical, 0);
}

#[tokio::test]
async fn test_retryable_page_failure_becomes_gap_and_scan_continues() {
    let mut source = MockSource::with_pages(vec![
        vec![contract("C-1", "AAA111BBB222", 50_000.0, "2024-03-06")],
        vec![contract("C-2", "AAA111BBB222", 50_000.0, "2024-03-06")],
        vec![contract("C-3", "AAA111BBB222", 50_000.0, "2024-03-06")],
    ]);
    source
        .failing_pages
        .insert(2, SourceError::Retryable("upstream 503".into()));

    let scanner = scanner(
        source,
        MockInvestigator::default(),
        None,
        vec![],
        fast_config(),
    );

    let report = scanner.scan(filter()).await.unwrap();
    assert_eq!(report.page_gaps.len(), 1);
    assert_eq!(report.page_gaps[0].page, 2);
    // Pages 1 and 3 were still analyzed.
    assert_eq!(report.total_scanned, 2);
}

#[tokio::test]
async fn test_terminal_failure_before_any_work_fails_the_scan() {
    let mut source = MockSource::with_pages(vec![vec![]]);
    source
        .failing_pages
        .insert(1, SourceError::Terminal("bad filter".into()));

    let scanner = scanner(
        source,
        MockInvestigator::default(),
        None,
        vec![],
        fast_config(),
    );

    let err = scanner.scan(filter()).await.unwrap_err();
    assert!(matches!(err, ScanError::Source(SourceError::Terminal(_))));
}

#[tokio::test]
async fn test_invalid_filter_rejected_before_fetching() {
    let source = MockSource::with_pages(vec![vec![]]);
    let scanner = scanner(
        source,
        MockInvestigator::default(),
        None,
        vec![],
        fast_config(),
    );

    let bad = ContractFilter::date_range(date("2024-12-31"), date("2024-01-01"));
    let err = scanner.scan(bad).await.unwrap_err();
    assert!(matches!(err, ScanError::InvalidFilter(_)));
    assert_eq!(scanner.source.fetch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancellation_preserves_completed_work() {
    let flag = CancelFlag::new();
    let mut source = MockSource::with_pages(vec![
        vec![contract("C-1", "AAA111BBB222", 50_000.0, "2024-03-06")],
        vec![contract("C-2", "AAA111BBB222", 50_000.0, "2024-03-06")],
        vec![contract("C-3", "AAA111BBB222", 50_000.0, "2024-03-06")],
    ]);
    // The source flips the cancel flag while serving page 2: its contracts
    // must not be dispatched, and page 3 must never be fetched.
    source.cancel_on_page = Some((2, flag.clone()));

    let source = Arc::new(source);
    let scanner = BatchScanner {
        source: Arc::clone(&source),
        investigator: Arc::new(MockInvestigator::default()),
        entities: None,
        exclusions: Arc::new(ExclusionList::from_records(vec![])),
        config: fast_config(),
        cancel: flag,
    };

    let report = scanner.scan(filter()).await.unwrap();
    assert!(report.cancelled);
    assert_eq!(report.total_scanned, 1);
    // Pages 1 and 2 fetched, page 3 never requested.
    assert_eq!(source.fetch_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_forward_exhaustion_defers_without_dropping_assessment() {
    let excluded = entity("EXCL00000001", "DEBARRED LLC", Some("2015-01-01"));
    let source = MockSource::with_pages(vec![vec![contract(
        "C-BAD",
        "EXCL00000001",
        500_000.0,
        "2024-03-06",
    )]])
    .index_histories();
    let investigator = MockInvestigator {
        fail_always: true,
        ..Default::default()
    };

    let mut config = fast_config();
    config.forward.max_attempts = 2;
    let scanner = scanner(
        source,
        investigator,
        index_of(vec![excluded]),
        vec![exclusion("EXCL00000001", "2020-01-01")],
        config,
    );

    let report = scanner.scan(filter()).await.unwrap();
    assert_eq!(report.deferred_forwards, 1);
    assert_eq!(report.forwarded, 0);
    // The assessment stays in the report regardless of delivery.
    assert_eq!(report.flagged.len(), 1);
    assert_eq!(report.flagged[0].tier, Severity::Critical);
}

#[tokio::test]
async fn test_history_fetch_failure_degrades_and_is_counted() {
    let splitter = entity("SPLIT0000001", "SPLITTER LLC", Some("2018-01-01"));
    let mut source = MockSource::with_pages(vec![vec![
        contract("C-1", "SPLIT0000001", 9_800.0, "2024-03-01"),
        contract("C-2", "SPLIT0000001", 9_700.0, "2024-03-11"),
    ]])
    .index_histories();
    source.failing_histories.push(EntityId::new("SPLIT0000001"));

    let scanner = scanner(
        source,
        MockInvestigator::default(),
        index_of(vec![splitter]),
        vec![],
        fast_config(),
    );

    let report = scanner.scan(filter()).await.unwrap();
    assert!(report.history_fetch_failures >= 1);
    // Without history the splitting detector cannot corroborate.
    assert!(report
        .flagged
        .iter()
        .all(|a| a.tier < Severity::High));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_pool_never_exceeds_configured_bound() {
    let contracts: Vec<Contract> = (0..24)
        .map(|i| {
            contract(
                &format!("C-{i}"),
                &format!("ENTITY{i:06}"),
                60_000.0,
                "2024-03-06",
            )
        })
        .collect();
    let mut source = MockSource::with_pages(vec![contracts]).index_histories();
    // Slow histories force analyses to overlap.
    source.history_delay = Duration::from_millis(15);

    let config = fast_config().with_concurrency(3);
    let scanner = scanner(source, MockInvestigator::default(), None, vec![], config);

    let report = scanner.scan(filter()).await.unwrap();
    assert_eq!(report.total_scanned, 24);
    assert!(report.peak_concurrency <= 3, "peak {}", report.peak_concurrency);
    assert!(report.peak_concurrency >= 1);
}

#[tokio::test]
async fn test_address_cluster_flags_exactly_the_clustered_entities() {
    // Five entities share one address (at the default minimum); three
    // unrelated entities share another. Only awards to the five are
    // flagged by the cluster detector.
    let mut entities = Vec::new();
    let mut contracts = Vec::new();
    for i in 0..5 {
        let id = format!("CLUSTR{i:06}");
        let mut e = entity(&id, "CLUSTERED LLC", Some("2015-01-01"));
        e.address.street = "44 Shared Plaza".into();
        entities.push(e);
        contracts.push(contract(&format!("C-IN-{i}"), &id, 60_000.0, "2024-03-06"));
    }
    for i in 0..3 {
        let id = format!("LONELY{i:06}");
        let mut e = entity(&id, "ELSEWHERE INC", Some("2015-01-01"));
        e.address.street = "9 Quiet Rd".into();
        entities.push(e);
        contracts.push(contract(&format!("C-OUT-{i}"), &id, 60_000.0, "2024-03-06"));
    }

    let source = MockSource::with_pages(vec![contracts]).index_histories();
    let scanner = scanner(
        source,
        MockInvestigator::default(),
        index_of(entities),
        vec![],
        fast_config(),
    );

    let report = scanner.scan(filter()).await.unwrap();
    let clustered: Vec<&str> = report
        .flagged
        .iter()
        .filter(|a| {
            a.signals
                .iter()
                .any(|s| s.detector == crate::types::DetectorKind::AddressClustering)
        })
        .map(|a| a.contract_id.as_str())
        .collect();
    assert_eq!(clustered.len(), 5);
    assert!(clustered.iter().all(|id| id.starts_with("C-IN-")));
}

#[tokio::test]
async fn test_report_ordering_is_final_sort_not_completion_order() {
    // Mixed tiers across two pages; flagged list must come back ordered by
    // tier then score regardless of analysis interleaving.
    let excluded = entity("EXCL00000001", "DEBARRED LLC", Some("2015-01-01"));
    let fresh = entity("FRESH0000001", "BRAND NEW LLC", Some("2024-02-01"));
    let mut sole = contract("C-LOW", "OTHER0000001", 90_000.0, "2024-03-06");
    sole.competition = CompetitionType::SoleSource;

    let source = MockSource::with_pages(vec![
        vec![sole, contract("C-HIGH", "FRESH0000001", 2_000_000.0, "2024-03-06")],
        vec![contract("C-CRIT", "EXCL00000001", 500_000.0, "2024-03-06")],
    ])
    .index_histories();

    let scanner = scanner(
        source,
        MockInvestigator::default(),
        index_of(vec![excluded, fresh]),
        vec![exclusion("EXCL00000001", "2020-01-01")],
        fast_config(),
    );

    let report = scanner.scan(filter()).await.unwrap();
    let tiers: Vec<Severity> = report.flagged.iter().map(|a| a.tier).collect();
    let mut sorted = tiers.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(tiers, sorted);
    assert_eq!(report.flagged[0].contract_id.as_str(), "C-CRIT");
}
