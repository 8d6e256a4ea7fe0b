//! Threshold-splitting detector.
//!
//! A requirement split across multiple awards, each held just below a
//! regulatory threshold, avoids the competition and oversight rules the
//! threshold would trigger (FAR 13.003(c)(2)).

use super::DetectorContext;
use crate::config::DetectorConfig;
use crate::types::{Contract, DetectionSignal, DetectorKind, Evidence, Severity};

#[derive(Debug, Clone)]
pub struct SplittingDetector {
    thresholds: Vec<f64>,
    margin: f64,
    window_days: i64,
    min_group: usize,
}

impl SplittingDetector {
    pub fn from_config(cfg: &DetectorConfig) -> Self {
        Self {
            thresholds: cfg.splitting_thresholds.clone(),
            margin: cfg.splitting_margin,
            window_days: cfg.splitting_window_days,
            min_group: cfg.splitting_min_group,
        }
    }

    /// Whether `amount` sits in the just-under band of `threshold`.
    fn in_band(&self, amount: f64, threshold: f64) -> bool {
        amount < threshold && amount >= threshold * (1.0 - self.margin)
    }

    pub fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<DetectionSignal> {
        let contract = ctx.contract;
        let mut signals = Vec::new();

        for &threshold in &self.thresholds {
            if !self.in_band(contract.amount, threshold) {
                continue;
            }

            // Other awards to the same recipient, in band, inside the
            // rolling window around this award.
            let companions: Vec<&Contract> = ctx
                .history
                .iter()
                .filter(|other| {
                    other.id != contract.id
                        && other.recipient_id == contract.recipient_id
                        && self.in_band(other.amount, threshold)
                        && (other.award_date - contract.award_date)
                            .num_days()
                            .abs()
                            <= self.window_days
                })
                .collect();

            let group_size = companions.len() + 1;
            if group_size < self.min_group {
                continue;
            }

            let group_total: f64 =
                contract.amount + companions.iter().map(|c| c.amount).sum::<f64>();
            let mut companion_ids: Vec<&str> =
                companions.iter().map(|c| c.id.as_str()).collect();
            companion_ids.sort_unstable();

            signals.push(
                DetectionSignal::new(
                    DetectorKind::ThresholdSplitting,
                    contract.id.clone(),
                    Severity::High,
                    75.0,
                    format!(
                        "{group_size} awards to the same recipient each just under ${threshold:.0} within {} days",
                        self.window_days
                    ),
                )
                .with_evidence(
                    Evidence::new("award_amount", format!("{:.2}", contract.amount))
                        .expecting(format!("not within {:.0}% below {threshold:.0}", self.margin * 100.0)),
                )
                .with_evidence(Evidence::new("threshold", format!("{threshold:.0}")))
                .with_evidence(Evidence::new("group_size", group_size.to_string()))
                .with_evidence(Evidence::new("group_total", format!("{group_total:.2}")))
                .with_evidence(Evidence::new("companion_awards", companion_ids.join(", "))),
            );
        }

        signals
    }
}
