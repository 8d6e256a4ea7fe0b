//! Modification-growth detector.
//!
//! A contract whose value balloons through modifications is the signature
//! of the lowball-bid strategy: win on an artificially thin price, then
//! recover the margin through post-award changes.

use super::DetectorContext;
use crate::config::DetectorConfig;
use crate::types::{DetectionSignal, DetectorKind, Evidence, Severity};

#[derive(Debug, Clone)]
pub struct ModificationDetector {
    growth_ratio: f64,
    extreme_ratio: f64,
}

impl ModificationDetector {
    pub fn from_config(cfg: &DetectorConfig) -> Self {
        Self {
            growth_ratio: cfg.modification_growth_ratio,
            extreme_ratio: cfg.modification_extreme_ratio,
        }
    }

    pub fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<DetectionSignal> {
        let contract = ctx.contract;
        if contract.modifications.is_empty() || contract.amount <= 0.0 {
            return Vec::new();
        }

        let growth = contract.modification_total();
        let ratio = growth / contract.amount;
        if ratio <= self.growth_ratio {
            return Vec::new();
        }

        let contribution = if ratio >= self.extreme_ratio { 60.0 } else { 40.0 };
        vec![DetectionSignal::new(
            DetectorKind::ModificationAnomaly,
            contract.id.clone(),
            Severity::High,
            contribution,
            format!(
                "Modifications grew the contract {:.0}% over its ${:.0} original value",
                ratio * 100.0,
                contract.amount
            ),
        )
        .with_evidence(Evidence::new(
            "original_value",
            format!("{:.2}", contract.amount),
        ))
        .with_evidence(Evidence::new(
            "cumulative_modifications",
            format!("{growth:.2}"),
        ))
        .with_evidence(
            Evidence::new("growth_ratio", format!("{ratio:.2}"))
                .expecting(format!("<={:.2}", self.growth_ratio)),
        )
        .with_evidence(Evidence::new(
            "modification_count",
            contract.modifications.len().to_string(),
        ))]
    }
}
