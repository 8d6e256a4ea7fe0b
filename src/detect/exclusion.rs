//! Exclusion-list violation detector.
//!
//! The single dispositive detector: an award to an entity whose exact
//! identifier appears on the exclusion list with the award date inside the
//! exclusion window is a violation regardless of anything else. Matching
//! is by identifier equality only — a prior design that allowed name
//! substring matches flagged a legitimate nonprofit and is the reason this
//! rule is absolute.

use super::DetectorContext;
use crate::types::{DetectionSignal, DetectorKind, Evidence, Severity};

#[derive(Debug, Clone, Default)]
pub struct ExclusionDetector;

impl ExclusionDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<DetectionSignal> {
        let contract = ctx.contract;
        ctx.exclusions
            .active_on(&contract.recipient_id, contract.award_date)
            .map(|record| {
                DetectionSignal::new(
                    DetectorKind::Exclusion,
                    contract.id.clone(),
                    Severity::Critical,
                    100.0,
                    format!(
                        "Recipient {} is excluded ({}) with the award date inside the exclusion window",
                        contract.recipient_id, record.program
                    ),
                )
                .with_evidence(
                    Evidence::new("recipient_id", contract.recipient_id.as_str())
                        .expecting("not on exclusion list"),
                )
                .with_evidence(
                    Evidence::new("exclusion_effective", record.effective.to_string())
                        .expecting(format!("after {}", contract.award_date)),
                )
                .with_evidence(Evidence::new(
                    "exclusion_termination",
                    record
                        .termination
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "none".into()),
                ))
                .with_evidence(Evidence::new(
                    "excluding_agency",
                    record.excluding_agency.clone(),
                ))
            })
            .collect()
    }
}
