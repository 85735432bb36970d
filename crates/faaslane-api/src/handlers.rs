//! REST API handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use faaslane_resolver::ResolveError;
use faaslane_slo::{SloAlert, SloError};

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

/// POST /system/slo-alert
pub async fn slo_alert(
    State(state): State<ApiState>,
    Json(alert): Json<SloAlert>,
) -> impl IntoResponse {
    match state.controller.handle_alert(&alert).await {
        Ok(outcome) => ApiResponse::ok(outcome).into_response(),
        Err(e @ SloError::MalformedAlert(_)) => {
            error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response()
        }
        Err(e) => error_response(&e.to_string(), StatusCode::BAD_GATEWAY).into_response(),
    }
}

/// GET /functions/{name}/resolve
pub async fn resolve_function(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.resolver.resolve(&name).await {
        Ok(target) => ApiResponse::ok(target).into_response(),
        Err(e @ ResolveError::NamespaceNotAllowed(_)) => {
            error_response(&e.to_string(), StatusCode::FORBIDDEN).into_response()
        }
        Err(e @ ResolveError::Lookup { .. }) => {
            error_response(&e.to_string(), StatusCode::NOT_FOUND).into_response()
        }
        Err(e @ ResolveError::NoAddresses { .. }) => {
            error_response(&e.to_string(), StatusCode::SERVICE_UNAVAILABLE).into_response()
        }
    }
}

/// Release request body.
#[derive(serde::Deserialize)]
pub struct ReleaseRequest {
    pub namespace: String,
    pub ip: String,
}

/// POST /system/connections/release
///
/// Invoked by the forwarding layer when a proxied request completes;
/// pairs with the increment least-connections selection performs.
pub async fn release_connection(
    State(state): State<ApiState>,
    Json(req): Json<ReleaseRequest>,
) -> impl IntoResponse {
    state.resolver.release(&req.namespace, &req.ip);
    ApiResponse::ok("released").into_response()
}

/// GET /system/recoveries
pub async fn recovery_status(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.controller.recoveries().snapshot()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::watch;

    use faaslane_cluster::{
        DeploymentInfo, Endpoints, InMemoryCluster, NodeInfo, PodInfo, FUNCTION_LABEL,
    };
    use faaslane_metrics::{MetricKind, MetricSource, MetricsError};
    use faaslane_resolver::{BalancingPolicy, FunctionResolver};
    use faaslane_slo::{SloConfig, SloController};

    struct StubMetrics {
        samples: HashMap<String, f64>,
    }

    #[async_trait]
    impl MetricSource for StubMetrics {
        async fn sample(
            &self,
            _kind: MetricKind,
            function: &str,
            _node: &str,
        ) -> Result<f64, MetricsError> {
            self.samples
                .get(function)
                .copied()
                .ok_or(MetricsError::EmptyResult)
        }

        async fn p99_latency(&self, _function: &str, _node: &str) -> Result<f64, MetricsError> {
            Ok(0.01)
        }
    }

    fn function_pod(name: &str, function: &str, node: &str) -> PodInfo {
        let mut labels = HashMap::new();
        labels.insert(FUNCTION_LABEL.to_string(), function.to_string());
        PodInfo {
            name: name.to_string(),
            namespace: "faaslane-fn".to_string(),
            node: node.to_string(),
            labels,
        }
    }

    fn test_state() -> (ApiState, Arc<InMemoryCluster>, watch::Sender<bool>) {
        let cluster = Arc::new(InMemoryCluster::new());
        cluster.set_endpoints("faaslane-fn", "echo", Endpoints::from_ips(["10.0.0.1"]));
        cluster.set_endpoints("faaslane-fn", "empty", Endpoints::default());

        for node in ["n1", "n2"] {
            cluster.add_node(NodeInfo {
                name: node.to_string(),
                labels: HashMap::new(),
            });
        }
        cluster.add_pod(function_pod("p1", "f1", "n1"));
        cluster.add_pod(function_pod("p2", "f2", "n1"));
        cluster.put_deployment(DeploymentInfo {
            name: "f2".to_string(),
            namespace: "faaslane-fn".to_string(),
            replicas: 1,
        });

        let metrics = Arc::new(StubMetrics {
            samples: HashMap::from([("f2".to_string(), 7.0)]),
        });

        let resolver = Arc::new(FunctionResolver::new(
            cluster.clone(),
            "faaslane-fn",
            BalancingPolicy::LeastConnections,
        ));
        let (tx, rx) = watch::channel(false);
        let controller = Arc::new(SloController::new(
            cluster.clone(),
            metrics,
            SloConfig::default(),
            rx,
        ));

        (
            ApiState {
                resolver,
                controller,
            },
            cluster,
            tx,
        )
    }

    fn alert(labels: &[(&str, &str)]) -> SloAlert {
        SloAlert {
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[tokio::test]
    async fn resolve_known_function_ok() {
        let (state, _, _tx) = test_state();
        let resp = resolve_function(State(state), Path("echo".to_string())).await;
        assert_eq!(resp.into_response().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn resolve_unknown_function_not_found() {
        let (state, _, _tx) = test_state();
        let resp = resolve_function(State(state), Path("ghost".to_string())).await;
        assert_eq!(resp.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn resolve_reserved_namespace_forbidden() {
        let (state, _, _tx) = test_state();
        let resp = resolve_function(State(state), Path("echo.kube-system".to_string())).await;
        assert_eq!(resp.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn resolve_without_addresses_unavailable() {
        let (state, _, _tx) = test_state();
        let resp = resolve_function(State(state), Path("empty".to_string())).await;
        assert_eq!(resp.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn alert_scales_and_returns_ok() {
        let (state, cluster, _tx) = test_state();
        let body = alert(&[
            ("node", "n1"),
            ("pod", "p1"),
            ("function", "f1"),
            ("latency_upper_limit", "0.5"),
        ]);

        let resp = slo_alert(State(state), Json(body)).await;
        assert_eq!(resp.into_response().status(), StatusCode::OK);
        assert_eq!(cluster.scale_calls().len(), 1);
    }

    #[tokio::test]
    async fn malformed_alert_is_bad_request() {
        let (state, _, _tx) = test_state();
        let body = alert(&[("node", "n1")]);

        let resp = slo_alert(State(state), Json(body)).await;
        assert_eq!(resp.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn release_decrements_in_flight() {
        let (state, _, _tx) = test_state();
        state.resolver.resolve("echo").await.unwrap();
        assert_eq!(
            state.resolver.in_flight_count("faaslane-fn", "10.0.0.1"),
            Some(1)
        );

        let req = ReleaseRequest {
            namespace: "faaslane-fn".to_string(),
            ip: "10.0.0.1".to_string(),
        };
        let resp = release_connection(State(state.clone()), Json(req)).await;

        assert_eq!(resp.into_response().status(), StatusCode::OK);
        assert_eq!(
            state.resolver.in_flight_count("faaslane-fn", "10.0.0.1"),
            Some(0)
        );
    }

    #[tokio::test]
    async fn recovery_status_is_ok_when_empty() {
        let (state, _, _tx) = test_state();
        let resp = recovery_status(State(state)).await;
        assert_eq!(resp.into_response().status(), StatusCode::OK);
    }
}
