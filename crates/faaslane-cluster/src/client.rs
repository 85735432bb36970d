//! The control-plane client trait and its error type.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{DeploymentInfo, Endpoints, NodeInfo, PodInfo};

/// Errors surfaced by control-plane queries.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("control plane request failed: {0}")]
    Upstream(String),
}

pub type ClusterResult<T> = Result<T, ClusterError>;

/// What the routing and scaling core consumes from the cluster
/// control plane.
///
/// Implementations are expected to be cheap to query repeatedly;
/// callers do not cache results across calls.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// All pods currently scheduled on the given node.
    async fn pods_on_node(&self, node: &str) -> ClusterResult<Vec<PodInfo>>;

    /// Endpoint subsets backing a function in a namespace.
    ///
    /// Fails with [`ClusterError::NotFound`] for an unknown function.
    async fn endpoints(&self, namespace: &str, function: &str) -> ClusterResult<Endpoints>;

    /// The deployment descriptor for a function.
    async fn deployment(&self, namespace: &str, function: &str) -> ClusterResult<DeploymentInfo>;

    /// Persist a new desired replica count for a function.
    async fn set_replicas(
        &self,
        namespace: &str,
        function: &str,
        replicas: u32,
    ) -> ClusterResult<()>;

    /// All cluster nodes with their role labels.
    async fn nodes(&self) -> ClusterResult<Vec<NodeInfo>>;
}
