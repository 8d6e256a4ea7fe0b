//! On-disk cache for the entity index.
//!
//! The cache document records a fingerprint of the source extract (length
//! plus modification time). A fingerprint mismatch, a missing file, or any
//! parse failure silently falls back to a rebuild; the cache can speed a
//! build up but never changes its result.

use std::fs;
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::logging::targets;
use crate::types::Entity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct Fingerprint {
    len: u64,
    mtime_secs: u64,
}

#[derive(Serialize, Deserialize)]
struct CacheDocument {
    fingerprint: Fingerprint,
    skipped_rows: u64,
    entities: Vec<Entity>,
}

/// Fingerprint of the source extract as it exists right now.
pub(super) fn source_fingerprint(source: &Path) -> io::Result<Fingerprint> {
    let meta = fs::metadata(source)?;
    let mtime_secs = meta
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Ok(Fingerprint {
        len: meta.len(),
        mtime_secs,
    })
}

/// Load cached entities when the stored fingerprint matches `expected`.
pub(super) fn load(cache_path: &Path, expected: &Fingerprint) -> Option<(Vec<Entity>, u64)> {
    let raw = fs::read(cache_path).ok()?;
    let doc: CacheDocument = match serde_json::from_slice(&raw) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(
                target: targets::INDEX,
                cache = %cache_path.display(),
                error = %e,
                "entity index cache unreadable, rebuilding"
            );
            return None;
        }
    };
    if &doc.fingerprint != expected {
        return None;
    }
    Some((doc.entities, doc.skipped_rows))
}

/// Write the cache document. Best effort: failures are logged, never fatal.
pub(super) fn store(
    cache_path: &Path,
    fingerprint: &Fingerprint,
    entities: &[Entity],
    skipped_rows: u64,
) {
    let doc = CacheDocument {
        fingerprint: fingerprint.clone(),
        skipped_rows,
        entities: entities.to_vec(),
    };
    let result = serde_json::to_vec(&doc)
        .map_err(io::Error::other)
        .and_then(|bytes| fs::write(cache_path, bytes));
    if let Err(e) = result {
        warn!(
            target: targets::INDEX,
            cache = %cache_path.display(),
            error = %e,
            "could not write entity index cache"
        );
    }
}
