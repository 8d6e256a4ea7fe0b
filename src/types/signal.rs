//! Detection signals and severity tiers.

use serde::{Deserialize, Serialize};

use super::ContractId;

/// Severity tier of a signal or assessment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Nothing detected.
    None,
    /// Weak indicator, requires corroboration.
    Low,
    /// Suspicious, warrants attention.
    Medium,
    /// Strong indicator, action recommended.
    High,
    /// Dispositive finding, immediate investigation.
    Critical,
}

impl Severity {
    /// Is this severity actionable (High or Critical)?
    pub fn is_actionable(&self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::None => "NONE",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

/// The closed set of detectors. One variant per detection algorithm.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Exclusion,
    RegistrationTiming,
    ThresholdSplitting,
    AddressClustering,
    BenfordDeviation,
    TemporalAnomaly,
    CompetitionAnomaly,
    ModificationAnomaly,
    EmployeeRevenueMismatch,
}

impl DetectorKind {
    /// Stable name for logging and report output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Exclusion => "exclusion",
            Self::RegistrationTiming => "registration_timing",
            Self::ThresholdSplitting => "threshold_splitting",
            Self::AddressClustering => "address_clustering",
            Self::BenfordDeviation => "benford_deviation",
            Self::TemporalAnomaly => "temporal_anomaly",
            Self::CompetitionAnomaly => "competition_anomaly",
            Self::ModificationAnomaly => "modification_anomaly",
            Self::EmployeeRevenueMismatch => "employee_revenue_mismatch",
        }
    }

    /// Whether the detector needs a resolved entity record to run.
    pub fn requires_entity(&self) -> bool {
        matches!(
            self,
            Self::Exclusion
                | Self::RegistrationTiming
                | Self::AddressClustering
                | Self::BenfordDeviation
                | Self::EmployeeRevenueMismatch
        )
    }
}

/// A field/value pair justifying a signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Field name the evidence was drawn from.
    pub field: String,
    /// Actual value found.
    pub value: String,
    /// What value would have indicated no finding, when meaningful.
    pub expected: Option<String>,
}

impl Evidence {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            expected: None,
        }
    }

    /// Builder-style method to record the non-suspicious value.
    pub fn expecting(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }
}

/// One finding from one detector for one contract.
///
/// Produced fresh per scan run and never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSignal {
    pub detector: DetectorKind,
    pub contract_id: ContractId,
    pub severity: Severity,
    /// Detector-local contribution on a 0-100 scale.
    pub contribution: f64,
    /// Human-readable rationale.
    pub rationale: String,
    pub evidence: Vec<Evidence>,
}

impl DetectionSignal {
    pub fn new(
        detector: DetectorKind,
        contract_id: ContractId,
        severity: Severity,
        contribution: f64,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            detector,
            contract_id,
            severity,
            contribution: contribution.clamp(0.0, 100.0),
            rationale: rationale.into(),
            evidence: Vec::new(),
        }
    }

    /// Builder-style method to attach evidence.
    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence.push(evidence);
        self
    }
}
