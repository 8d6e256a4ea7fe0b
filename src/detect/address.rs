//! Address-clustering detector.
//!
//! Many entities registered at one address suggests a shell-company
//! network creating the appearance of competition. Clustering is by exact
//! normalized-address equality; the cluster size is computed by the entity
//! index and handed in through the context.

use super::DetectorContext;
use crate::config::DetectorConfig;
use crate::types::{DetectionSignal, DetectorKind, Evidence, Severity};

#[derive(Debug, Clone)]
pub struct AddressDetector {
    min_cluster: usize,
    large_cluster: usize,
}

impl AddressDetector {
    pub fn from_config(cfg: &DetectorConfig) -> Self {
        Self {
            min_cluster: cfg.address_min_cluster,
            large_cluster: cfg.address_large_cluster,
        }
    }

    pub fn detect(&self, ctx: &DetectorContext<'_>) -> Vec<DetectionSignal> {
        let contract = ctx.contract;
        let Some(entity) = ctx.entity else {
            return Vec::new();
        };
        let Some(cluster_size) = ctx.cluster_size else {
            return Vec::new();
        };
        if cluster_size < self.min_cluster {
            return Vec::new();
        }

        let contribution = if cluster_size >= self.large_cluster {
            60.0
        } else {
            40.0
        };
        vec![DetectionSignal::new(
            DetectorKind::AddressClustering,
            contract.id.clone(),
            Severity::High,
            contribution,
            format!(
                "Recipient shares its registered address with {} other entities",
                cluster_size - 1
            ),
        )
        .with_evidence(Evidence::new(
            "normalized_address",
            entity.address.normalized(),
        ))
        .with_evidence(
            Evidence::new("cluster_size", cluster_size.to_string())
                .expecting(format!("<{}", self.min_cluster)),
        )]
    }
}
