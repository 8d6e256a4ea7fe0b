//! Competition-quality detector.
//!
//! Sole-source awards and "competitive" awards that drew exactly one offer
//! both point at procurements whose winner was settled in advance.

use super::DetectorContext;
use crate::types::{CompetitionType, DetectionSignal, DetectorKind, Evidence, Severity};

#[derive(Debug, Clone, Default)]
pub struct CompetitionDetector;

impl CompetitionDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<DetectionSignal> {
        let contract = ctx.contract;
        match contract.competition {
            CompetitionType::SoleSource => vec![DetectionSignal::new(
                DetectorKind::CompetitionAnomaly,
                contract.id.clone(),
                Severity::Medium,
                10.0,
                "Award was sole-source, without competition",
            )
            .with_evidence(
                Evidence::new("competition_type", "sole_source").expecting("competed"),
            )],
            CompetitionType::Competed if contract.offers_received == 1 => {
                vec![DetectionSignal::new(
                    DetectorKind::CompetitionAnomaly,
                    contract.id.clone(),
                    Severity::Medium,
                    10.0,
                    "Nominally competed award received only one offer",
                )
                .with_evidence(
                    Evidence::new("offers_received", "1").expecting(">1 on a competed award"),
                )]
            }
            CompetitionType::Competed => Vec::new(),
        }
    }
}
