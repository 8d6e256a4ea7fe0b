//! Investigation handoff.
//!
//! High-severity assessments are handed to an external investigation
//! collaborator as immutable bundles. The collaborator is an unreliable
//! remote dependency: delivery is attempted with bounded retries and
//! exponential backoff, and exhaustion defers the bundle — a reportable,
//! non-fatal state that never removes the assessment from the report.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::ForwardConfig;
use crate::errors::ForwardError;
use crate::logging::targets;
use crate::score::RiskAssessment;
use crate::types::{Contract, Entity};

/// Immutable handoff payload: the contract, its resolved entity (when the
/// index knew it), and the full assessment.
#[derive(Debug, Clone)]
pub struct InvestigationBundle {
    pub contract: Contract,
    pub entity: Option<Entity>,
    pub assessment: RiskAssessment,
}

/// External investigation collaborator.
///
/// Accepts a bundle and asynchronously produces or stores a narrative
/// report elsewhere; this crate only guarantees the delivery attempt.
#[async_trait]
pub trait Investigator: Send + Sync {
    async fn investigate(&self, bundle: InvestigationBundle) -> Result<(), ForwardError>;
}

/// Delivery result after retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    Delivered { attempts: u32 },
    /// All attempts exhausted; the bundle was not delivered.
    Deferred { attempts: u32 },
}

/// Attempt delivery with bounded retries and exponential backoff.
pub(super) async fn forward_with_retry<I: Investigator + ?Sized>(
    investigator: &I,
    bundle: InvestigationBundle,
    config: &ForwardConfig,
) -> ForwardOutcome {
    let max_attempts = config.max_attempts.max(1);
    let contract_id = bundle.assessment.contract_id.clone();

    for attempt in 1..=max_attempts {
        match investigator.investigate(bundle.clone()).await {
            Ok(()) => {
                info!(
                    target: targets::FORWARD,
                    contract_id = %contract_id,
                    attempt,
                    "investigation bundle delivered"
                );
                return ForwardOutcome::Delivered { attempts: attempt };
            }
            Err(e) if attempt < max_attempts => {
                let backoff =
                    Duration::from_millis(config.initial_backoff_ms << (attempt - 1));
                warn!(
                    target: targets::FORWARD,
                    contract_id = %contract_id,
                    attempt,
                    max_attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "investigation delivery failed, backing off"
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => {
                warn!(
                    target: targets::FORWARD,
                    contract_id = %contract_id,
                    attempts = max_attempts,
                    error = %e,
                    "investigation delivery exhausted retries, deferring"
                );
            }
        }
    }
    ForwardOutcome::Deferred {
        attempts: max_attempts,
    }
}
