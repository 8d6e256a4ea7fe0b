#![deny(unreachable_pub)]

// Core modules
mod consts;
mod errors;

// Domain model
pub mod types;

// Feature modules
pub mod config;
pub mod detect;
pub mod index;
pub mod logging;
pub mod scan;
pub mod score;

// Re-exports
pub use config::{AggregatorConfig, DetectorConfig, ForwardConfig, RateLimitConfig, ScanConfig};
pub use consts::{
    BENFORD_EXPECTED, CHI_SQUARE_CRITICAL_P05, MICRO_PURCHASE_THRESHOLD,
    SIMPLIFIED_ACQUISITION_THRESHOLD,
};
pub use detect::{Detector, DetectorContext};
pub use errors::{ForwardError, IndexError, ScanError, SourceError};
pub use index::{EntityIndex, ExclusionList};
pub use scan::{
    AwardsApiClient, BatchScanner, CancelFlag, ContractFilter, ContractPage, ContractSource,
    InvestigationBundle, Investigator, PageGap, RateLimiter, ScanReport, TierCounts,
};
pub use score::{aggregate, RiskAssessment};
pub use types::{
    Address, CompetitionType, Contract, ContractId, DetectionSignal, DetectorKind,
    EmployeeBracket, Entity, EntityId, Evidence, ExclusionRecord, Modification, Severity,
};
