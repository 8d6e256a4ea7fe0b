//! Tunable configuration for detectors, aggregation, and scanning.
//!
//! Every numeric cutoff a detector reasons about lives here rather than
//! being hard-coded at the detection site, so deployments can tighten or
//! relax individual signals without code changes.

use serde::{Deserialize, Serialize};

use crate::consts::{
    CHI_SQUARE_CRITICAL_P05, MICRO_PURCHASE_THRESHOLD, SIMPLIFIED_ACQUISITION_THRESHOLD,
};
use crate::types::{DetectorKind, Severity};

/// Thresholds for the detector suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Registration-to-award gap below which the timing detector fires.
    pub registration_max_age_days: i64,
    /// Gap below which the timing signal escalates its contribution.
    pub registration_fast_track_days: i64,
    /// Minimum award amount for the timing detector to apply.
    pub registration_min_award: f64,
    /// Regulatory thresholds checked for splitting, in USD.
    pub splitting_thresholds: Vec<f64>,
    /// Fractional margin below a threshold that counts as "just under"
    /// (0.10 = within 90-100% of the threshold, exclusive of it).
    pub splitting_margin: f64,
    /// Rolling window for grouping same-recipient awards.
    pub splitting_window_days: i64,
    /// Minimum awards in the band (including the scanned one) to fire.
    pub splitting_min_group: usize,
    /// Minimum entities at one normalized address to fire.
    pub address_min_cluster: usize,
    /// Cluster size at which the contribution escalates.
    pub address_large_cluster: usize,
    /// Minimum usable amounts before Benford analysis is conclusive.
    pub benford_min_samples: usize,
    /// Chi-square statistic above which the distribution is anomalous.
    pub benford_chi_square_critical: f64,
    /// Days before fiscal year end (Sept 30) treated as the rush window.
    pub temporal_fy_window_days: u32,
    /// Benchmark annual revenue per employee in USD.
    pub employee_revenue_per_employee: f64,
    /// Award-to-plausible-revenue ratio that fires at MEDIUM.
    pub employee_ratio: f64,
    /// Ratio at which the mismatch escalates to HIGH.
    pub employee_high_ratio: f64,
    /// Cumulative-modification to original-value ratio that fires.
    pub modification_growth_ratio: f64,
    /// Ratio at which the modification signal escalates.
    pub modification_extreme_ratio: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            registration_max_age_days: 90,
            registration_fast_track_days: 30,
            registration_min_award: 0.0,
            splitting_thresholds: vec![
                MICRO_PURCHASE_THRESHOLD,
                SIMPLIFIED_ACQUISITION_THRESHOLD,
            ],
            splitting_margin: 0.10,
            splitting_window_days: 365,
            splitting_min_group: 2,
            address_min_cluster: 5,
            address_large_cluster: 10,
            benford_min_samples: 10,
            benford_chi_square_critical: CHI_SQUARE_CRITICAL_P05,
            temporal_fy_window_days: 7,
            employee_revenue_per_employee: 250_000.0,
            employee_ratio: 2.0,
            employee_high_ratio: 3.0,
            modification_growth_ratio: 0.5,
            modification_extreme_ratio: 2.0,
        }
    }
}

/// Per-detector weights applied when folding contributions into the
/// aggregate score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub exclusion_weight: f64,
    pub registration_weight: f64,
    pub splitting_weight: f64,
    pub address_weight: f64,
    pub benford_weight: f64,
    pub temporal_weight: f64,
    pub competition_weight: f64,
    pub modification_weight: f64,
    pub employee_weight: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            exclusion_weight: 1.0,
            registration_weight: 1.0,
            splitting_weight: 1.0,
            address_weight: 1.0,
            benford_weight: 1.0,
            temporal_weight: 1.0,
            competition_weight: 1.0,
            modification_weight: 1.0,
            employee_weight: 1.0,
        }
    }
}

impl AggregatorConfig {
    /// Weight for a detector's contributions.
    pub fn weight(&self, kind: DetectorKind) -> f64 {
        match kind {
            DetectorKind::Exclusion => self.exclusion_weight,
            DetectorKind::RegistrationTiming => self.registration_weight,
            DetectorKind::ThresholdSplitting => self.splitting_weight,
            DetectorKind::AddressClustering => self.address_weight,
            DetectorKind::BenfordDeviation => self.benford_weight,
            DetectorKind::TemporalAnomaly => self.temporal_weight,
            DetectorKind::CompetitionAnomaly => self.competition_weight,
            DetectorKind::ModificationAnomaly => self.modification_weight,
            DetectorKind::EmployeeRevenueMismatch => self.employee_weight,
        }
    }
}

/// Pacing for outbound calls to the upstream data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Sustained outbound request rate.
    pub requests_per_second: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 5.0,
        }
    }
}

/// Retry policy for the investigation handoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// Total delivery attempts before marking the bundle deferred.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles each retry.
    pub initial_backoff_ms: u64,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
        }
    }
}

/// Top-level batch scanner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum contract analyses in flight at once.
    pub concurrency: usize,
    /// Minimum tier at which assessments are forwarded for investigation.
    pub forward_tier: Severity,
    /// Consecutive unfetchable pages tolerated before fetching stops.
    pub max_consecutive_page_gaps: u32,
    pub rate: RateLimitConfig,
    pub forward: ForwardConfig,
    pub detectors: DetectorConfig,
    pub aggregator: AggregatorConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 20,
            forward_tier: Severity::High,
            max_consecutive_page_gaps: 2,
            rate: RateLimitConfig::default(),
            forward: ForwardConfig::default(),
            detectors: DetectorConfig::default(),
            aggregator: AggregatorConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Builder-style method to set the worker pool size.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Builder-style method to set the outbound request rate.
    pub fn with_rate(mut self, requests_per_second: f64) -> Self {
        self.rate.requests_per_second = requests_per_second;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ScanConfig::default();
        assert_eq!(cfg.concurrency, 20);
        assert_eq!(cfg.forward_tier, Severity::High);
        assert_eq!(cfg.detectors.registration_max_age_days, 90);
        assert_eq!(cfg.detectors.address_min_cluster, 5);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let cfg: ScanConfig = serde_json::from_str(r#"{"concurrency": 4}"#).unwrap();
        assert_eq!(cfg.concurrency, 4);
        assert_eq!(cfg.detectors.benford_min_samples, 10);
    }

    #[test]
    fn test_concurrency_floor() {
        let cfg = ScanConfig::default().with_concurrency(0);
        assert_eq!(cfg.concurrency, 1);
    }
}
