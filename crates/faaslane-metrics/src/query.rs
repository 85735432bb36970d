//! Query builders for the supported metric kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::QueryRequest;

/// The contention metric the SLO controller ranks siblings by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Request throughput over a 30m window.
    Qps,
    /// Container CPU consumption over a 30s window.
    Cpu,
}

impl MetricKind {
    /// Build the instant query for one function on one node.
    pub fn query(&self, function: &str, node: &str) -> QueryRequest {
        let query = match self {
            Self::Qps => format!(
                "rate(faaslane_requests_total{{function=\"{function}\",node=\"{node}\"}}[30m])"
            ),
            Self::Cpu => format!(
                "sum(rate(container_cpu_usage_seconds_total{{function=\"{function}\",node=\"{node}\"}}[30s]))"
            ),
        };
        QueryRequest::new(query)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Qps => write!(f, "qps"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qps" => Ok(Self::Qps),
            "cpu" => Ok(Self::Cpu),
            other => Err(format!("unknown metric kind {other:?}, expected qps or cpu")),
        }
    }
}

/// The 99th-percentile latency of a function on a node over a fixed
/// 30s trailing window. Used by the recovery watcher.
pub fn p99_latency_query(function: &str, node: &str) -> QueryRequest {
    QueryRequest::new(format!(
        "histogram_quantile(0.99, sum by (function, node, le) \
         (rate(faaslane_request_duration_seconds_bucket{{function=\"{function}\",node=\"{node}\"}}[30s])))"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qps_query_scopes_function_and_node() {
        let req = MetricKind::Qps.query("resize", "n1");
        assert_eq!(
            req.query,
            "rate(faaslane_requests_total{function=\"resize\",node=\"n1\"}[30m])"
        );
        assert!(req.time.is_none());
    }

    #[test]
    fn cpu_query_scopes_function_and_node() {
        let req = MetricKind::Cpu.query("resize", "n1");
        assert!(req.query.contains("container_cpu_usage_seconds_total"));
        assert!(req.query.contains("function=\"resize\""));
        assert!(req.query.contains("node=\"n1\""));
    }

    #[test]
    fn p99_query_uses_histogram_quantile() {
        let req = p99_latency_query("resize", "n1");
        assert!(req.query.starts_with("histogram_quantile(0.99"));
        assert!(req.query.contains("faaslane_request_duration_seconds_bucket"));
        assert!(req.query.contains("[30s]"));
    }

    #[test]
    fn kind_parses_from_str() {
        assert_eq!("qps".parse::<MetricKind>().unwrap(), MetricKind::Qps);
        assert_eq!("cpu".parse::<MetricKind>().unwrap(), MetricKind::Cpu);
        assert!("memory".parse::<MetricKind>().is_err());
    }
}
