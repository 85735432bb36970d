//! SLO controller error types.

use thiserror::Error;

use faaslane_cluster::ClusterError;

/// Errors from one alert-handling run.
#[derive(Debug, Error)]
pub enum SloError {
    /// The alert payload is missing labels or carries unparsable
    /// values. Rejected before any side effect.
    #[error("malformed alert: {0}")]
    MalformedAlert(String),

    /// A control-plane query failed; the run is aborted.
    #[error("cluster query failed: {0}")]
    Cluster(#[from] ClusterError),

    /// Every sibling metric query failed, leaving nothing to rank.
    #[error("all {failed} sibling metric queries failed")]
    MetricsUnavailable { failed: usize },
}
