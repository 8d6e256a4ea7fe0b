//! Contract award records.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::EntityId;

/// Unique award identifier (PIID-equivalent).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(String);

impl ContractId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the award was competed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionType {
    /// Awarded without competition.
    SoleSource,
    /// Nominally full-and-open competition.
    Competed,
}

/// A single contract modification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modification {
    /// Modification sequence number.
    pub number: u32,
    /// Date the modification was signed.
    pub date: NaiveDate,
    /// Signed change to the contract value in USD.
    pub amount_delta: f64,
}

/// A federal contract award.
///
/// Immutable once fetched; the upstream source is idempotent, so re-fetching
/// the same identifier yields the same logical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    /// Awarding agency name.
    pub agency: String,
    /// Recipient entity identifier (UEI-equivalent, case-normalized).
    pub recipient_id: EntityId,
    /// Original award amount in USD, non-negative.
    pub amount: f64,
    pub award_date: NaiveDate,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub competition: CompetitionType,
    /// Number of offers received.
    pub offers_received: u32,
    /// Modifications in sequence order.
    pub modifications: Vec<Modification>,
    pub description: Option<String>,
}

impl Contract {
    /// Net cumulative value change across all modifications.
    pub fn modification_total(&self) -> f64 {
        self.modifications.iter().map(|m| m.amount_delta).sum()
    }
}
