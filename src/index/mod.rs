//! Cached entity index over bulk contractor registration data.
//!
//! The index is built once per process run from a bulk extract, optionally
//! round-tripped through an on-disk cache keyed by a source fingerprint,
//! and shared read-only for the duration of a scan. Lookups are exact-key
//! only; address clustering groups on byte-equal normalized addresses.

mod cache;
mod exclusions;

pub use exclusions::ExclusionList;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::errors::IndexError;
use crate::logging::targets;
use crate::types::{Address, EmployeeBracket, Entity, EntityId};

/// Pipe-delimited field positions in the registration bulk extract.
mod fields {
    pub(super) const UEI: usize = 0;
    pub(super) const REGISTRATION_DATE: usize = 7;
    pub(super) const LEGAL_NAME: usize = 11;
    pub(super) const ADDRESS1: usize = 15;
    pub(super) const CITY: usize = 17;
    pub(super) const STATE: usize = 18;
    pub(super) const ZIP: usize = 19;
    pub(super) const ENTITY_URL: usize = 26;
    pub(super) const EMPLOYEE_COUNT: usize = 30;
    /// Rows shorter than this are malformed.
    pub(super) const MIN_FIELDS: usize = 30;
}

/// In-memory lookup structure over contractor registrations.
#[derive(Debug)]
pub struct EntityIndex {
    entities: HashMap<EntityId, Entity>,
    /// Normalized address -> entity ids registered there.
    clusters: HashMap<String, Vec<EntityId>>,
    skipped_rows: u64,
}

impl EntityIndex {
    /// Build the index from a bulk extract, reusing `cache_path` when its
    /// recorded source fingerprint still matches.
    ///
    /// Malformed rows are skipped and counted, never fatal; a missing or
    /// unreadable source is [`IndexError::Unavailable`]. The cache is a
    /// pure optimization: any cache problem falls back to a full rebuild.
    pub fn build(source: &Path, cache_path: Option<&Path>) -> Result<Self, IndexError> {
        let fingerprint = cache::source_fingerprint(source)
            .map_err(|e| IndexError::unavailable(source, e.to_string()))?;

        if let Some(cache_path) = cache_path {
            if let Some((entities, skipped_rows)) = cache::load(cache_path, &fingerprint) {
                info!(
                    target: targets::INDEX,
                    entities = entities.len(),
                    cache = %cache_path.display(),
                    "entity index loaded from cache"
                );
                return Ok(Self::from_entities_with_skips(entities, skipped_rows));
            }
        }

        let file =
            File::open(source).map_err(|e| IndexError::unavailable(source, e.to_string()))?;
        let reader = BufReader::new(file);

        let mut entities = Vec::new();
        let mut skipped = 0u64;
        for line in reader.lines() {
            let line = line.map_err(|e| IndexError::unavailable(source, e.to_string()))?;
            match parse_entity_row(&line) {
                RowOutcome::Entity(entity) => entities.push(entity),
                RowOutcome::Skip => skipped += 1,
                RowOutcome::Marker => {}
            }
        }

        info!(
            target: targets::INDEX,
            entities = entities.len(),
            skipped_rows = skipped,
            source = %source.display(),
            "entity index built from source"
        );

        if let Some(cache_path) = cache_path {
            cache::store(cache_path, &fingerprint, &entities, skipped);
        }

        Ok(Self::from_entities_with_skips(entities, skipped))
    }

    /// Build directly from in-memory entities (used by cache loads and tests).
    pub fn from_entities(entities: Vec<Entity>) -> Self {
        Self::from_entities_with_skips(entities, 0)
    }

    fn from_entities_with_skips(entities: Vec<Entity>, skipped_rows: u64) -> Self {
        let mut map = HashMap::with_capacity(entities.len());
        let mut clusters: HashMap<String, Vec<EntityId>> = HashMap::new();
        for entity in entities {
            if !entity.address.is_empty() {
                clusters
                    .entry(entity.address.normalized())
                    .or_default()
                    .push(entity.id.clone());
            }
            map.insert(entity.id.clone(), entity);
        }
        // Deterministic cluster membership order regardless of input order.
        for ids in clusters.values_mut() {
            ids.sort();
            ids.dedup();
        }
        Self {
            entities: map,
            clusters,
            skipped_rows,
        }
    }

    /// Exact-identifier lookup. O(1) expected.
    pub fn lookup(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Groups of entity ids keyed by normalized address.
    pub fn cluster_by_address(&self) -> &HashMap<String, Vec<EntityId>> {
        &self.clusters
    }

    /// Number of entities registered at the same normalized address as
    /// `id`, including `id` itself. `None` when the entity is unknown or
    /// has no usable address.
    pub fn cluster_size(&self, id: &EntityId) -> Option<usize> {
        let entity = self.entities.get(id)?;
        if entity.address.is_empty() {
            return None;
        }
        self.clusters
            .get(&entity.address.normalized())
            .map(|ids| ids.len())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Malformed rows skipped during the build.
    pub fn skipped_rows(&self) -> u64 {
        self.skipped_rows
    }
}

enum RowOutcome {
    Entity(Entity),
    Skip,
    /// BOF/EOF marker or blank line; not counted as malformed.
    Marker,
}

fn parse_entity_row(line: &str) -> RowOutcome {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with("BOF ") || trimmed.starts_with("EOF ") {
        return RowOutcome::Marker;
    }
    let cleaned = trimmed.trim_end_matches("!end");
    let parts: Vec<&str> = cleaned.split('|').collect();
    if parts.len() < fields::MIN_FIELDS {
        return RowOutcome::Skip;
    }

    let id = EntityId::new(parts[fields::UEI]);
    if id.is_empty() {
        return RowOutcome::Skip;
    }

    let registration_date = parse_extract_date(parts[fields::REGISTRATION_DATE]);
    let employees = parts
        .get(fields::EMPLOYEE_COUNT)
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .map(EmployeeBracket::from_count);
    let website = match parts.get(fields::ENTITY_URL).map(|s| s.trim()) {
        Some("") | None => None,
        Some(url) => Some(url.to_string()),
    };

    RowOutcome::Entity(Entity {
        id,
        legal_name: parts[fields::LEGAL_NAME].trim().to_string(),
        registration_date,
        address: Address {
            street: parts[fields::ADDRESS1].trim().to_string(),
            city: parts[fields::CITY].trim().to_string(),
            state: parts[fields::STATE].trim().to_string(),
            postal: parts[fields::ZIP].trim().to_string(),
        },
        employees,
        website,
    })
}

/// Registration extracts carry dates as YYYYMMDD.
fn parse_extract_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .map_err(|_| {
            warn!(target: targets::INDEX, value = raw, "unparseable extract date");
        })
        .ok()
}
