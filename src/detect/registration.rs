//! Registration-timing detector.
//!
//! Legitimate contractors usually have years of registration history before
//! winning awards; shell companies are created shortly before the award
//! they were created for.

use super::DetectorContext;
use crate::config::DetectorConfig;
use crate::types::{DetectionSignal, DetectorKind, Evidence, Severity};

#[derive(Debug, Clone)]
pub struct RegistrationDetector {
    max_age_days: i64,
    fast_track_days: i64,
    min_award: f64,
}

impl RegistrationDetector {
    pub fn from_config(cfg: &DetectorConfig) -> Self {
        Self {
            max_age_days: cfg.registration_max_age_days,
            fast_track_days: cfg.registration_fast_track_days,
            min_award: cfg.registration_min_award,
        }
    }

    pub fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<DetectionSignal> {
        let contract = ctx.contract;
        let Some(entity) = ctx.entity else {
            return Vec::new();
        };
        let Some(registered) = entity.registration_date else {
            return Vec::new();
        };
        if contract.amount < self.min_award {
            return Vec::new();
        }

        let age_days = (contract.award_date - registered).num_days();
        if age_days < 0 || age_days >= self.max_age_days {
            return Vec::new();
        }

        let contribution = if age_days < self.fast_track_days {
            85.0
        } else {
            70.0
        };
        vec![DetectionSignal::new(
            DetectorKind::RegistrationTiming,
            contract.id.clone(),
            Severity::High,
            contribution,
            format!(
                "Entity registered only {age_days} days before a ${:.0} award",
                contract.amount
            ),
        )
        .with_evidence(Evidence::new(
            "registration_date",
            registered.to_string(),
        ))
        .with_evidence(Evidence::new("award_date", contract.award_date.to_string()))
        .with_evidence(
            Evidence::new("days_between", age_days.to_string())
                .expecting(format!(">={}", self.max_age_days)),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{contract, entity};
    use super::*;
    use crate::index::ExclusionList;

    fn detect(registered: &str, awarded: &str) -> Vec<DetectionSignal> {
        let e = entity("AAA111BBB222", "FRESH LLC", Some(registered));
        let c = contract("C-1", "AAA111BBB222", 1_500_000.0, awarded);
        let exclusions = ExclusionList::from_records(vec![]);
        RegistrationDetector::from_config(&DetectorConfig::default()).detect(&DetectorContext {
            contract: &c,
            entity: Some(&e),
            exclusions: &exclusions,
            history: &[],
            cluster_size: None,
        })
    }

    #[test]
    fn test_fires_at_31_days() {
        let signals = detect("2024-01-01", "2024-02-01");
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].severity, Severity::High);
        assert_eq!(signals[0].contribution, 70.0);
    }

    #[test]
    fn test_escalates_under_30_days() {
        let signals = detect("2024-01-01", "2024-01-20");
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].contribution, 85.0);
    }

    #[test]
    fn test_silent_after_a_year() {
        assert!(detect("2024-01-01", "2025-01-01").is_empty());
    }

    #[test]
    fn test_silent_when_award_predates_registration() {
        assert!(detect("2024-06-01", "2024-01-01").is_empty());
    }

    #[test]
    fn test_silent_without_registration_date() {
        let e = entity("AAA111BBB222", "FRESH LLC", None);
        let c = contract("C-1", "AAA111BBB222", 1_500_000.0, "2024-02-01");
        let exclusions = ExclusionList::from_records(vec![]);
        let signals =
            RegistrationDetector::from_config(&DetectorConfig::default()).detect(&DetectorContext {
                contract: &c,
                entity: Some(&e),
                exclusions: &exclusions,
                history: &[],
                cluster_size: None,
            });
        assert!(signals.is_empty());
    }
}
