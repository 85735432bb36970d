//! In-memory control plane for tests and standalone mode.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use crate::client::{ClusterClient, ClusterError, ClusterResult};
use crate::types::{DeploymentInfo, Endpoints, NodeInfo, PodInfo};

#[derive(Default)]
struct ClusterData {
    pods: Vec<PodInfo>,
    /// (namespace, function) → endpoints.
    endpoints: HashMap<(String, String), Endpoints>,
    /// (namespace, function) → deployment.
    deployments: HashMap<(String, String), DeploymentInfo>,
    nodes: Vec<NodeInfo>,
    /// Every `set_replicas` call, in order: (namespace, function, replicas).
    scale_calls: Vec<(String, String, u32)>,
}

/// A [`ClusterClient`] backed by in-process maps.
///
/// Replica updates are applied to the stored deployment and recorded
/// so tests can assert on exactly which updates happened.
#[derive(Default)]
pub struct InMemoryCluster {
    data: RwLock<ClusterData>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&self, node: NodeInfo) {
        self.data.write().expect("cluster lock").nodes.push(node);
    }

    pub fn add_pod(&self, pod: PodInfo) {
        self.data.write().expect("cluster lock").pods.push(pod);
    }

    pub fn put_deployment(&self, deployment: DeploymentInfo) {
        let key = (deployment.namespace.clone(), deployment.name.clone());
        self.data
            .write()
            .expect("cluster lock")
            .deployments
            .insert(key, deployment);
    }

    pub fn set_endpoints(&self, namespace: &str, function: &str, endpoints: Endpoints) {
        self.data
            .write()
            .expect("cluster lock")
            .endpoints
            .insert((namespace.to_string(), function.to_string()), endpoints);
    }

    /// All recorded replica updates, oldest first.
    pub fn scale_calls(&self) -> Vec<(String, String, u32)> {
        self.data.read().expect("cluster lock").scale_calls.clone()
    }
}

#[async_trait]
impl ClusterClient for InMemoryCluster {
    async fn pods_on_node(&self, node: &str) -> ClusterResult<Vec<PodInfo>> {
        let data = self.data.read().expect("cluster lock");
        Ok(data
            .pods
            .iter()
            .filter(|p| p.node == node)
            .cloned()
            .collect())
    }

    async fn endpoints(&self, namespace: &str, function: &str) -> ClusterResult<Endpoints> {
        let data = self.data.read().expect("cluster lock");
        data.endpoints
            .get(&(namespace.to_string(), function.to_string()))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound {
                kind: "endpoints",
                name: format!("{function}.{namespace}"),
            })
    }

    async fn deployment(&self, namespace: &str, function: &str) -> ClusterResult<DeploymentInfo> {
        let data = self.data.read().expect("cluster lock");
        data.deployments
            .get(&(namespace.to_string(), function.to_string()))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound {
                kind: "deployment",
                name: format!("{function}.{namespace}"),
            })
    }

    async fn set_replicas(
        &self,
        namespace: &str,
        function: &str,
        replicas: u32,
    ) -> ClusterResult<()> {
        let mut data = self.data.write().expect("cluster lock");
        let key = (namespace.to_string(), function.to_string());
        let deployment = data.deployments.get_mut(&key).ok_or_else(|| ClusterError::NotFound {
            kind: "deployment",
            name: format!("{function}.{namespace}"),
        })?;
        deployment.replicas = replicas;
        debug!(function, namespace, replicas, "replica count updated");
        data.scale_calls
            .push((namespace.to_string(), function.to_string(), replicas));
        Ok(())
    }

    async fn nodes(&self) -> ClusterResult<Vec<NodeInfo>> {
        Ok(self.data.read().expect("cluster lock").nodes.clone())
    }
}
