use std::path::PathBuf;

use thiserror::Error;

/// Entity index build/read errors.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The bulk source extract is missing or unreadable. Callers are
    /// expected to degrade to unresolved entity lookups, not abort.
    #[error("entity source unavailable at {path}: {reason}")]
    Unavailable { path: PathBuf, reason: String },
}

impl IndexError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Contract data source errors, classified for retry handling.
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    /// Transient upstream failure (network, 5xx). Worth retrying with backoff.
    #[error("retryable source error: {0}")]
    Retryable(String),
    /// Permanent failure (4xx, malformed filter). Retrying cannot help.
    #[error("terminal source error: {0}")]
    Terminal(String),
}

impl SourceError {
    /// Classify an HTTP status + body into a source error.
    pub fn from_status(status: u16, body: &str) -> Self {
        if (400..500).contains(&status) {
            Self::Terminal(format!("status {status}: {body}"))
        } else {
            Self::Retryable(format!("status {status}: {body}"))
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

/// Investigation handoff delivery errors.
#[derive(Error, Debug, Clone)]
pub enum ForwardError {
    #[error("investigation delivery failed: {0}")]
    Delivery(String),
}

/// Scan-level failures surfaced to the caller.
///
/// Per-record and per-page problems are absorbed into the report; only a
/// scan that cannot start at all produces one of these.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("invalid scan filter: {0}")]
    InvalidFilter(String),
    /// The source failed terminally before any contract was processed.
    #[error("contract source failed before any work: {0}")]
    Source(#[from] SourceError),
}
