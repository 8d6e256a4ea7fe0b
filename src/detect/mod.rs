//! The detector suite: nine independent, pure detection functions.
//!
//! Detectors are a closed set modeled as tagged variants — the suite is
//! fixed and enumerable, not extensible at runtime. Each detector consumes
//! a contract plus whatever reference data it needs and emits zero or more
//! [`DetectionSignal`]s. Detectors never mutate shared state, never consult
//! the wall clock, and may run in any order or concurrently.

mod address;
mod benford;
mod competition;
mod employee;
mod exclusion;
mod modification;
mod registration;
mod splitting;
mod temporal;

pub use address::AddressDetector;
pub use benford::BenfordDetector;
pub use competition::CompetitionDetector;
pub use employee::EmployeeRevenueDetector;
pub use exclusion::ExclusionDetector;
pub use modification::ModificationDetector;
pub use registration::RegistrationDetector;
pub use splitting::SplittingDetector;
pub use temporal::TemporalDetector;

use crate::config::DetectorConfig;
use crate::index::ExclusionList;
use crate::types::{Contract, DetectionSignal, DetectorKind, Entity};

/// Read-only inputs for one contract's detector pass.
#[derive(Debug, Clone, Copy)]
pub struct DetectorContext<'a> {
    pub contract: &'a Contract,
    /// Resolved recipient record, when the entity index knows it.
    pub entity: Option<&'a Entity>,
    pub exclusions: &'a ExclusionList,
    /// The recipient's historical awards (may include the scanned one).
    pub history: &'a [Contract],
    /// Entities sharing the recipient's normalized address, including it.
    pub cluster_size: Option<usize>,
}

/// One detector from the closed suite.
#[derive(Debug, Clone)]
pub enum Detector {
    Exclusion(ExclusionDetector),
    Registration(RegistrationDetector),
    Splitting(SplittingDetector),
    Address(AddressDetector),
    Benford(BenfordDetector),
    Temporal(TemporalDetector),
    Competition(CompetitionDetector),
    Modification(ModificationDetector),
    EmployeeRevenue(EmployeeRevenueDetector),
}

impl Detector {
    /// The full suite, configured from `cfg`, in stable order.
    pub fn suite(cfg: &DetectorConfig) -> Vec<Detector> {
        vec![
            Detector::Exclusion(ExclusionDetector::new()),
            Detector::Registration(RegistrationDetector::from_config(cfg)),
            Detector::Splitting(SplittingDetector::from_config(cfg)),
            Detector::Address(AddressDetector::from_config(cfg)),
            Detector::Benford(BenfordDetector::from_config(cfg)),
            Detector::Temporal(TemporalDetector::from_config(cfg)),
            Detector::Competition(CompetitionDetector::new()),
            Detector::Modification(ModificationDetector::from_config(cfg)),
            Detector::EmployeeRevenue(EmployeeRevenueDetector::from_config(cfg)),
        ]
    }

    pub fn kind(&self) -> DetectorKind {
        match self {
            Self::Exclusion(_) => DetectorKind::Exclusion,
            Self::Registration(_) => DetectorKind::RegistrationTiming,
            Self::Splitting(_) => DetectorKind::ThresholdSplitting,
            Self::Address(_) => DetectorKind::AddressClustering,
            Self::Benford(_) => DetectorKind::BenfordDeviation,
            Self::Temporal(_) => DetectorKind::TemporalAnomaly,
            Self::Competition(_) => DetectorKind::CompetitionAnomaly,
            Self::Modification(_) => DetectorKind::ModificationAnomaly,
            Self::EmployeeRevenue(_) => DetectorKind::EmployeeRevenueMismatch,
        }
    }

    /// Evaluate this detector against one contract's context.
    ///
    /// Entity-dependent detectors emit nothing when the recipient is
    /// unresolved; the aggregator records that state separately.
    pub fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<DetectionSignal> {
        if self.kind().requires_entity() && ctx.entity.is_none() {
            return Vec::new();
        }
        match self {
            Self::Exclusion(d) => d.detect(ctx),
            Self::Registration(d) => d.detect(ctx),
            Self::Splitting(d) => d.detect(ctx),
            Self::Address(d) => d.detect(ctx),
            Self::Benford(d) => d.detect(ctx),
            Self::Temporal(d) => d.detect(ctx),
            Self::Competition(d) => d.detect(ctx),
            Self::Modification(d) => d.detect(ctx),
            Self::EmployeeRevenue(d) => d.detect(ctx),
        }
    }
}

/// Run every detector in `suite` and collect the signals.
pub fn run_suite(suite: &[Detector], ctx: &DetectorContext<'_>) -> Vec<DetectionSignal> {
    suite.iter().flat_map(|d| d.detect(ctx)).collect()
}
