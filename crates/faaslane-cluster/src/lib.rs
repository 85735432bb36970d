//! faaslane-cluster — the cluster control-plane collaborator.
//!
//! The routing and scaling core never talks to an orchestrator API
//! directly. Everything it needs from the cluster — pods scheduled on
//! a node, endpoint subsets backing a function, deployment replica
//! counts, node role labels — goes through the [`ClusterClient`]
//! trait. [`InMemoryCluster`] implements it over plain maps and is
//! used by tests and by the daemon's standalone mode.

pub mod client;
pub mod memory;
pub mod types;

pub use client::{ClusterClient, ClusterError, ClusterResult};
pub use memory::InMemoryCluster;
pub use types::{
    DeploymentInfo, EndpointAddress, EndpointSubset, Endpoints, NodeInfo, PodInfo, FUNCTION_LABEL,
};
