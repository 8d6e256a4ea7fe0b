//! Exclusion (debarment/suspension) records keyed by exact identifier.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use crate::errors::IndexError;
use crate::logging::targets;
use crate::types::{EntityId, ExclusionRecord};

/// Column headers expected in the exclusions extract.
const COL_UEI: &str = "Unique Entity ID";
const COL_ACTIVE: &str = "Active Date";
const COL_TERMINATION: &str = "Termination Date";
const COL_PROGRAM: &str = "Exclusion Program";
const COL_AGENCY: &str = "Excluding Agency";

/// Lookup over exclusion records.
///
/// Relationship to entities is by exact identifier equality only; the list
/// never matches on names. Multiple records per identifier are kept.
#[derive(Debug, Default)]
pub struct ExclusionList {
    by_id: HashMap<EntityId, Vec<ExclusionRecord>>,
    skipped_rows: u64,
}

impl ExclusionList {
    /// Load the exclusions CSV extract (header row required).
    ///
    /// Rows without an identifier or a parseable active date are skipped
    /// and counted.
    pub fn from_csv(path: &Path) -> Result<Self, IndexError> {
        let file = File::open(path).map_err(|e| IndexError::unavailable(path, e.to_string()))?;
        let mut lines = BufReader::new(file).lines();

        let header = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => return Err(IndexError::unavailable(path, e.to_string())),
            None => return Err(IndexError::unavailable(path, "empty exclusions file")),
        };
        let columns = split_csv_line(&header);
        let col = |name: &str| columns.iter().position(|c| c == name);
        let (uei_col, active_col) = match (col(COL_UEI), col(COL_ACTIVE)) {
            (Some(u), Some(a)) => (u, a),
            _ => {
                return Err(IndexError::unavailable(
                    path,
                    "exclusions header missing identifier or active date column",
                ))
            }
        };
        let termination_col = col(COL_TERMINATION);
        let program_col = col(COL_PROGRAM);
        let agency_col = col(COL_AGENCY);

        let mut list = Self::default();
        for line in lines {
            let line = line.map_err(|e| IndexError::unavailable(path, e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let row = split_csv_line(&line);

            let id = EntityId::new(field(&row, Some(uei_col)));
            let effective = parse_exclusion_date(field(&row, Some(active_col)));
            let (id, effective) = match (id.is_empty(), effective) {
                (false, Some(effective)) => (id, effective),
                _ => {
                    list.skipped_rows += 1;
                    continue;
                }
            };

            list.push(ExclusionRecord {
                entity_id: id,
                effective,
                termination: parse_exclusion_date(field(&row, termination_col)),
                program: field(&row, program_col).to_string(),
                excluding_agency: field(&row, agency_col).to_string(),
            });
        }

        info!(
            target: targets::INDEX,
            records = list.len(),
            skipped_rows = list.skipped_rows,
            source = %path.display(),
            "exclusion list loaded"
        );
        Ok(list)
    }

    /// Build directly from records (tests, in-memory sources).
    pub fn from_records(records: Vec<ExclusionRecord>) -> Self {
        let mut list = Self::default();
        for record in records {
            list.push(record);
        }
        list
    }

    fn push(&mut self, record: ExclusionRecord) {
        self.by_id
            .entry(record.entity_id.clone())
            .or_default()
            .push(record);
    }

    /// All records for an identifier, exact match only.
    pub fn records_for(&self, id: &EntityId) -> &[ExclusionRecord] {
        self.by_id.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Records whose exclusion window covers `date`, exact-id match only.
    pub fn active_on<'a>(
        &'a self,
        id: &EntityId,
        date: NaiveDate,
    ) -> impl Iterator<Item = &'a ExclusionRecord> {
        self.records_for(id)
            .iter()
            .filter(move |rec| rec.is_active_on(date))
    }

    pub fn len(&self) -> usize {
        self.by_id.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn skipped_rows(&self) -> u64 {
        self.skipped_rows
    }
}

fn field<'a>(row: &'a [String], idx: Option<usize>) -> &'a str {
    idx.and_then(|i| row.get(i)).map(String::as_str).unwrap_or("")
}

/// Exclusion extracts are inconsistent about date formats; accept the
/// three forms observed in the wild. "Indefinite" terminations parse as
/// no date at all.
fn parse_exclusion_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("indefinite") {
        return None;
    }
    for fmt in ["%m/%d/%Y", "%Y-%m-%d", "%Y%m%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }
    None
}

/// Minimal CSV field splitter handling double-quoted fields with embedded
/// commas and doubled-quote escapes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}
