//! Scan report assembly.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::score::RiskAssessment;
use crate::types::Severity;

/// Flagged-assessment counts per severity tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
    pub critical: u64,
}

impl TierCounts {
    pub(super) fn record(&mut self, tier: Severity) {
        match tier {
            Severity::None => {}
            Severity::Low => self.low += 1,
            Severity::Medium => self.medium += 1,
            Severity::High => self.high += 1,
            Severity::Critical => self.critical += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.low + self.medium + self.high + self.critical
    }
}

/// A page the source could not deliver after retries.
#[derive(Debug, Clone, Serialize)]
pub struct PageGap {
    pub page: u32,
    pub error: String,
}

/// Logical result of a batch scan.
///
/// Output formatting belongs to the reporting layer; this is the report's
/// contractual shape.
#[derive(Debug, Serialize)]
pub struct ScanReport {
    /// Contracts that completed analysis.
    pub total_scanned: u64,
    pub tier_counts: TierCounts,
    /// Flagged assessments, sorted by descending tier, then descending
    /// score, then contract id. The sort is applied once, after all work
    /// completes.
    pub flagged: Vec<RiskAssessment>,
    /// Pages skipped after retry exhaustion.
    pub page_gaps: Vec<PageGap>,
    /// Recipient-history fetches that failed (degraded those detectors).
    pub history_fetch_failures: u64,
    /// Bundles delivered to the investigation collaborator.
    pub forwarded: u64,
    /// Bundles deferred after delivery retries were exhausted.
    pub deferred_forwards: u64,
    /// Peak number of concurrent analyses observed.
    pub peak_concurrency: usize,
    /// The scan was cancelled before all pages were processed.
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ScanReport {
    pub fn total_flagged(&self) -> u64 {
        self.tier_counts.total()
    }

    /// One-line summary for logging.
    pub fn summary(&self) -> String {
        format!(
            "scanned={} flagged={} (critical={} high={} medium={} low={}) \
             gaps={} deferred={}{}",
            self.total_scanned,
            self.total_flagged(),
            self.tier_counts.critical,
            self.tier_counts.high,
            self.tier_counts.medium,
            self.tier_counts.low,
            self.page_gaps.len(),
            self.deferred_forwards,
            if self.cancelled { " (cancelled)" } else { "" },
        )
    }
}
