//! Domain model: contracts, entities, exclusions, and detection signals.

mod contract;
mod entity;
mod signal;

pub use contract::{CompetitionType, Contract, ContractId, Modification};
pub use entity::{Address, EmployeeBracket, Entity, EntityId, ExclusionRecord};
pub use signal::{DetectionSignal, DetectorKind, Evidence, Severity};
