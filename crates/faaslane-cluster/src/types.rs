//! Domain types mirrored from the cluster control plane.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Pod label carrying the name of the function the pod serves.
pub const FUNCTION_LABEL: &str = "faaslane.io/function";

/// Node label marking a control-plane node.
const CONTROL_PLANE_LABEL: &str = "node-role.faaslane.io/control-plane";

/// Node label marking a node reserved for platform components.
const PLATFORM_LABEL: &str = "node-role.faaslane.io/platform";

/// A single backend address within an endpoint subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointAddress {
    pub ip: String,
}

/// A group of addresses backing one function within a namespace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointSubset {
    #[serde(default)]
    pub addresses: Vec<EndpointAddress>,
}

/// The endpoint object for a function: zero or more subsets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default)]
    pub subsets: Vec<EndpointSubset>,
}

impl Endpoints {
    /// Build endpoints with a single subset from a list of IPs.
    pub fn from_ips<I, S>(ips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subsets: vec![EndpointSubset {
                addresses: ips
                    .into_iter()
                    .map(|ip| EndpointAddress { ip: ip.into() })
                    .collect(),
            }],
        }
    }
}

/// A pod as seen by the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    /// Name of the node the pod is scheduled on.
    pub node: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl PodInfo {
    /// The function this pod serves, from the `faaslane.io/function` label.
    pub fn function(&self) -> Option<&str> {
        self.labels.get(FUNCTION_LABEL).map(String::as_str)
    }
}

/// A function deployment descriptor, reduced to what scaling needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentInfo {
    pub name: String,
    pub namespace: String,
    pub replicas: u32,
}

/// A cluster node with its role labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl NodeInfo {
    pub fn is_control_plane(&self) -> bool {
        self.labels.contains_key(CONTROL_PLANE_LABEL)
    }

    pub fn is_platform_reserved(&self) -> bool {
        self.labels.contains_key(PLATFORM_LABEL)
    }

    /// Whether function pods may be scheduled on this node.
    pub fn is_eligible(&self) -> bool {
        !self.is_control_plane() && !self.is_platform_reserved()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_with_label(label: Option<&str>) -> NodeInfo {
        let mut labels = HashMap::new();
        if let Some(l) = label {
            labels.insert(l.to_string(), String::new());
        }
        NodeInfo {
            name: "n1".to_string(),
            labels,
        }
    }

    #[test]
    fn worker_node_is_eligible() {
        assert!(node_with_label(None).is_eligible());
    }

    #[test]
    fn control_plane_node_is_not_eligible() {
        let node = node_with_label(Some(CONTROL_PLANE_LABEL));
        assert!(node.is_control_plane());
        assert!(!node.is_eligible());
    }

    #[test]
    fn platform_node_is_not_eligible() {
        let node = node_with_label(Some(PLATFORM_LABEL));
        assert!(node.is_platform_reserved());
        assert!(!node.is_eligible());
    }

    #[test]
    fn pod_function_comes_from_label() {
        let mut labels = HashMap::new();
        labels.insert(FUNCTION_LABEL.to_string(), "resize".to_string());
        let pod = PodInfo {
            name: "resize-abc".to_string(),
            namespace: "faaslane-fn".to_string(),
            node: "n1".to_string(),
            labels,
        };
        assert_eq!(pod.function(), Some("resize"));
    }

    #[test]
    fn endpoints_from_ips_builds_one_subset() {
        let ep = Endpoints::from_ips(["10.0.0.1", "10.0.0.2"]);
        assert_eq!(ep.subsets.len(), 1);
        assert_eq!(ep.subsets[0].addresses.len(), 2);
        assert_eq!(ep.subsets[0].addresses[0].ip, "10.0.0.1");
    }
}
