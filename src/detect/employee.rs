//! Employee/revenue plausibility detector.
//!
//! An award far beyond what the recipient's declared headcount could
//! plausibly deliver suggests a pass-through arrangement or a shell with
//! no real labor capacity behind it.

use super::DetectorContext;
use crate::config::DetectorConfig;
use crate::types::{DetectionSignal, DetectorKind, Evidence, Severity};

#[derive(Debug, Clone)]
pub struct EmployeeRevenueDetector {
    revenue_per_employee: f64,
    ratio: f64,
    high_ratio: f64,
}

impl EmployeeRevenueDetector {
    pub fn from_config(cfg: &DetectorConfig) -> Self {
        Self {
            revenue_per_employee: cfg.employee_revenue_per_employee,
            ratio: cfg.employee_ratio,
            high_ratio: cfg.employee_high_ratio,
        }
    }

    pub fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<DetectionSignal> {
        let contract = ctx.contract;
        let Some(entity) = ctx.entity else {
            return Vec::new();
        };
        let Some(bracket) = entity.employees else {
            return Vec::new();
        };
        if contract.amount <= 0.0 {
            return Vec::new();
        }

        let plausible = bracket.midpoint() * self.revenue_per_employee;
        let ratio = contract.amount / plausible;
        if ratio <= self.ratio {
            return Vec::new();
        }

        let (severity, contribution) = if ratio >= self.high_ratio {
            (Severity::High, 40.0)
        } else {
            (Severity::Medium, 25.0)
        };
        vec![DetectionSignal::new(
            DetectorKind::EmployeeRevenueMismatch,
            contract.id.clone(),
            severity,
            contribution,
            format!(
                "${:.0} award is {ratio:.1}x what a {} employee firm plausibly delivers",
                contract.amount,
                bracket.label()
            ),
        )
        .with_evidence(Evidence::new("employee_bracket", bracket.label()))
        .with_evidence(Evidence::new(
            "plausible_revenue",
            format!("{plausible:.0}"),
        ))
        .with_evidence(
            Evidence::new("award_to_plausible_ratio", format!("{ratio:.2}"))
                .expecting(format!("<={:.1}", self.ratio)),
        )]
    }
}
