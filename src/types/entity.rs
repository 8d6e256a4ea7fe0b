//! Contractor registration records and exclusions.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Stable unique entity identifier (UEI-equivalent).
///
/// This is the only key used for authoritative matching. Construction
/// normalizes case and surrounding whitespace so that lookups are exact
/// regardless of source formatting; there is deliberately no fuzzy or
/// substring matching anywhere in the crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mailing address of a registered entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal: String,
}

impl Address {
    /// Normalized clustering key: lowercase, punctuation stripped,
    /// whitespace collapsed. Two entities cluster together only when this
    /// string is byte-equal; there is no geocoding or fuzzy proximity.
    pub fn normalized(&self) -> String {
        let raw = format!(
            "{} {} {} {}",
            self.street,
            self.city,
            self.state,
            // Postal+4 extensions would split otherwise-identical addresses.
            self.postal.split('-').next().unwrap_or(""),
        );
        let mut out = String::with_capacity(raw.len());
        let mut last_space = true;
        for ch in raw.chars() {
            if ch.is_alphanumeric() {
                out.extend(ch.to_lowercase());
                last_space = false;
            } else if !last_space {
                out.push(' ');
                last_space = true;
            }
        }
        out.trim_end().to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.street.trim().is_empty()
    }
}

/// Declared employee-count bracket from the registration extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeBracket {
    UpToTen,
    TenToFifty,
    FiftyToTwoFifty,
    TwoFiftyToThousand,
    OverThousand,
}

impl EmployeeBracket {
    /// Bracket from a raw headcount.
    pub fn from_count(count: u64) -> Self {
        match count {
            0..=10 => Self::UpToTen,
            11..=50 => Self::TenToFifty,
            51..=250 => Self::FiftyToTwoFifty,
            251..=1000 => Self::TwoFiftyToThousand,
            _ => Self::OverThousand,
        }
    }

    /// Representative headcount used for revenue plausibility checks.
    pub fn midpoint(&self) -> f64 {
        match self {
            Self::UpToTen => 5.0,
            Self::TenToFifty => 30.0,
            Self::FiftyToTwoFifty => 150.0,
            Self::TwoFiftyToThousand => 625.0,
            Self::OverThousand => 2000.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::UpToTen => "1-10",
            Self::TenToFifty => "11-50",
            Self::FiftyToTwoFifty => "51-250",
            Self::TwoFiftyToThousand => "251-1000",
            Self::OverThousand => "1000+",
        }
    }
}

/// A contractor registration record.
///
/// Read-only reference data for the duration of a scan run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub legal_name: String,
    pub registration_date: Option<NaiveDate>,
    pub address: Address,
    pub employees: Option<EmployeeBracket>,
    pub website: Option<String>,
}

/// An exclusion (debarment/suspension) record.
///
/// Related to an entity by exact identifier equality only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionRecord {
    pub entity_id: EntityId,
    /// Date the exclusion took effect.
    pub effective: NaiveDate,
    /// End of the exclusion window; `None` means still active.
    pub termination: Option<NaiveDate>,
    /// Source program (e.g. "Reciprocal", "Procurement").
    pub program: String,
    pub excluding_agency: String,
}

impl ExclusionRecord {
    /// Whether the exclusion window covers `date`.
    ///
    /// Active when `effective <= date` and the termination date is absent
    /// or strictly after `date`.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        if self.effective > date {
            return false;
        }
        match self.termination {
            Some(term) => term > date,
            None => true,
        }
    }
}
