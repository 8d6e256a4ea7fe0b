//! Risk aggregation: fold detector signals into one assessment per contract.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AggregatorConfig;
use crate::types::{ContractId, DetectionSignal, Severity};

/// Score thresholds mapping the weighted sum to a tier.
const TIER_MEDIUM_FLOOR: f64 = 25.0;
const TIER_HIGH_FLOOR: f64 = 50.0;
const TIER_CRITICAL_FLOOR: f64 = 75.0;

/// The aggregated fraud-risk result for one contract in one scan run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub contract_id: ContractId,
    /// Signals ordered by descending severity, then descending
    /// contribution, then detector name.
    pub signals: Vec<DetectionSignal>,
    /// Aggregate score in [0, 100], monotonic in the signals present.
    pub score: f64,
    pub tier: Severity,
    /// The recipient could not be resolved against the entity index, so
    /// entity-dependent detectors did not run.
    pub entity_unresolved: bool,
    /// Suggested next step for the tier.
    pub recommendation: String,
    pub timestamp: DateTime<Utc>,
}

impl RiskAssessment {
    /// Whether any signal was raised at all.
    pub fn is_flagged(&self) -> bool {
        self.tier > Severity::None
    }
}

/// Deterministic presentation order for signals.
fn signal_order(a: &DetectionSignal, b: &DetectionSignal) -> Ordering {
    b.severity
        .cmp(&a.severity)
        .then_with(|| {
            b.contribution
                .partial_cmp(&a.contribution)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.detector.name().cmp(b.detector.name()))
}

/// Tier implied by the score alone, before the dispositive rule.
fn score_tier(score: f64) -> Severity {
    if score >= TIER_CRITICAL_FLOOR {
        Severity::Critical
    } else if score >= TIER_HIGH_FLOOR {
        Severity::High
    } else if score >= TIER_MEDIUM_FLOOR {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn recommendation_for(tier: Severity) -> &'static str {
    match tier {
        Severity::Critical => {
            "IMMEDIATE: refer to the Inspector General and suspend pending contract actions"
        }
        Severity::High => {
            "URGENT: conduct enhanced due diligence before further contract actions"
        }
        Severity::Medium => "REVIEW: perform additional verification of the recipient",
        Severity::Low => "MONITOR: note for ongoing observation alongside other signals",
        Severity::None => "No action required",
    }
}

/// Fold signals into a single explainable assessment.
///
/// A CRITICAL signal is dispositive: the final tier is CRITICAL no matter
/// what else contributed. Without one, the weighted contributions are
/// summed, capped at 100, and mapped through fixed thresholds — but never
/// past HIGH, so the CRITICAL tier appears exactly when a CRITICAL signal
/// does.
pub fn aggregate(
    contract_id: ContractId,
    mut signals: Vec<DetectionSignal>,
    entity_unresolved: bool,
    cfg: &AggregatorConfig,
) -> RiskAssessment {
    let has_critical = signals.iter().any(|s| s.severity == Severity::Critical);

    let weighted_sum: f64 = signals
        .iter()
        .map(|s| cfg.weight(s.detector) * s.contribution)
        .sum();
    let score = weighted_sum.clamp(0.0, 100.0);

    let tier = if has_critical {
        Severity::Critical
    } else if signals.is_empty() {
        Severity::None
    } else {
        // The CRITICAL tier is reserved for dispositive signals.
        score_tier(score).min(Severity::High)
    };

    signals.sort_by(signal_order);

    RiskAssessment {
        contract_id,
        signals,
        score,
        tier,
        entity_unresolved,
        recommendation: recommendation_for(tier).to_string(),
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DetectorKind;

    fn signal(detector: DetectorKind, severity: Severity, contribution: f64) -> DetectionSignal {
        DetectionSignal::new(
            detector,
            ContractId::new("C-1"),
            severity,
            contribution,
            "test",
        )
    }

    fn run(signals: Vec<DetectionSignal>) -> RiskAssessment {
        aggregate(
            ContractId::new("C-1"),
            signals,
            false,
            &AggregatorConfig::default(),
        )
    }

    #[test]
    fn test_no_signals_is_none_tier() {
        let assessment = run(vec![]);
        assert_eq!(assessment.tier, Severity::None);
        assert_eq!(assessment.score, 0.0);
        assert!(!assessment.is_flagged());
    }

    #[test]
    fn test_critical_is_dispositive() {
        let assessment = run(vec![
            signal(DetectorKind::Exclusion, Severity::Critical, 100.0),
            signal(DetectorKind::TemporalAnomaly, Severity::Low, 5.0),
        ]);
        assert_eq!(assessment.tier, Severity::Critical);
        assert_eq!(assessment.score, 100.0);
    }

    #[test]
    fn test_critical_tier_requires_critical_signal() {
        // Two HIGH signals push the sum past 75, but the tier stays HIGH.
        let assessment = run(vec![
            signal(DetectorKind::RegistrationTiming, Severity::High, 70.0),
            signal(DetectorKind::ThresholdSplitting, Severity::High, 75.0),
        ]);
        assert_eq!(assessment.score, 100.0);
        assert_eq!(assessment.tier, Severity::High);
    }

    #[test]
    fn test_tier_thresholds() {
        let low = run(vec![signal(DetectorKind::TemporalAnomaly, Severity::Low, 5.0)]);
        assert_eq!(low.tier, Severity::Low);

        let medium = run(vec![signal(
            DetectorKind::BenfordDeviation,
            Severity::Medium,
            30.0,
        )]);
        assert_eq!(medium.tier, Severity::Medium);

        let high = run(vec![signal(
            DetectorKind::AddressClustering,
            Severity::High,
            60.0,
        )]);
        assert_eq!(high.tier, Severity::High);
    }

    #[test]
    fn test_score_is_capped_and_monotonic() {
        let base = run(vec![signal(
            DetectorKind::RegistrationTiming,
            Severity::High,
            70.0,
        )]);
        let more = run(vec![
            signal(DetectorKind::RegistrationTiming, Severity::High, 70.0),
            signal(DetectorKind::AddressClustering, Severity::High, 60.0),
        ]);
        assert!(more.score >= base.score);
        assert!(more.tier >= base.tier);
        assert!(more.score <= 100.0);
    }

    #[test]
    fn test_weights_scale_contributions() {
        let mut cfg = AggregatorConfig::default();
        cfg.temporal_weight = 0.5;
        let assessment = aggregate(
            ContractId::new("C-1"),
            vec![signal(DetectorKind::TemporalAnomaly, Severity::Medium, 10.0)],
            false,
            &cfg,
        );
        assert_eq!(assessment.score, 5.0);
    }

    #[test]
    fn test_signal_ordering_deterministic() {
        let assessment = run(vec![
            signal(DetectorKind::TemporalAnomaly, Severity::Low, 5.0),
            signal(DetectorKind::CompetitionAnomaly, Severity::Medium, 10.0),
            signal(DetectorKind::AddressClustering, Severity::High, 40.0),
            signal(DetectorKind::RegistrationTiming, Severity::High, 70.0),
        ]);
        let order: Vec<DetectorKind> = assessment.signals.iter().map(|s| s.detector).collect();
        assert_eq!(
            order,
            vec![
                DetectorKind::RegistrationTiming,
                DetectorKind::AddressClustering,
                DetectorKind::CompetitionAnomaly,
                DetectorKind::TemporalAnomaly,
            ]
        );
    }

    #[test]
    fn test_aggregation_is_order_independent() {
        let a = run(vec![
            signal(DetectorKind::TemporalAnomaly, Severity::Low, 5.0),
            signal(DetectorKind::RegistrationTiming, Severity::High, 70.0),
        ]);
        let b = run(vec![
            signal(DetectorKind::RegistrationTiming, Severity::High, 70.0),
            signal(DetectorKind::TemporalAnomaly, Severity::Low, 5.0),
        ]);
        assert_eq!(a.score, b.score);
        assert_eq!(a.tier, b.tier);
        assert_eq!(a.signals, b.signals);
    }
}
