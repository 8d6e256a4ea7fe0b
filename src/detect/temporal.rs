//! Temporal-anomaly detector.
//!
//! Weekend awards bypass normal oversight chains; fiscal year-end awards
//! ride use-it-or-lose-it budget pressure. Both are weighted indicators,
//! never sole flags. All date reasoning is over the award date in the
//! record itself.

use chrono::{Datelike, Weekday};

use super::DetectorContext;
use crate::config::DetectorConfig;
use crate::consts::{FISCAL_YEAR_END_DAY, FISCAL_YEAR_END_MONTH};
use crate::types::{DetectionSignal, DetectorKind, Evidence, Severity};

#[derive(Debug, Clone)]
pub struct TemporalDetector {
    fy_window_days: u32,
}

impl TemporalDetector {
    pub fn from_config(cfg: &DetectorConfig) -> Self {
        Self {
            fy_window_days: cfg.temporal_fy_window_days,
        }
    }

    pub fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<DetectionSignal> {
        let contract = ctx.contract;
        let award = contract.award_date;
        let mut signals = Vec::new();

        let weekday = award.weekday();
        if weekday == Weekday::Sat || weekday == Weekday::Sun {
            signals.push(
                DetectionSignal::new(
                    DetectorKind::TemporalAnomaly,
                    contract.id.clone(),
                    Severity::Medium,
                    10.0,
                    format!("Contract awarded on a {weekday}"),
                )
                .with_evidence(
                    Evidence::new("award_date", award.to_string()).expecting("a business day"),
                ),
            );
        }

        if award.month() == FISCAL_YEAR_END_MONTH {
            if award.day() == FISCAL_YEAR_END_DAY {
                signals.push(
                    DetectionSignal::new(
                        DetectorKind::TemporalAnomaly,
                        contract.id.clone(),
                        Severity::Medium,
                        10.0,
                        "Contract awarded on the last day of the fiscal year",
                    )
                    .with_evidence(Evidence::new("award_date", award.to_string())),
                );
            } else if award.day() > FISCAL_YEAR_END_DAY.saturating_sub(self.fy_window_days) {
                signals.push(
                    DetectionSignal::new(
                        DetectorKind::TemporalAnomaly,
                        contract.id.clone(),
                        Severity::Low,
                        5.0,
                        format!(
                            "Contract awarded within the last {} days of the fiscal year",
                            self.fy_window_days
                        ),
                    )
                    .with_evidence(Evidence::new("award_date", award.to_string()))
                    .with_evidence(Evidence::new(
                        "days_before_fy_end",
                        (FISCAL_YEAR_END_DAY - award.day()).to_string(),
                    )),
                );
            }
        }

        signals
    }
}
