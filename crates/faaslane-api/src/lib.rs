//! faaslane-api — REST surface for the routing and scaling core.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/system/slo-alert` | SLO-violation alert webhook |
//! | GET | `/functions/{name}/resolve` | Resolve a function name to a backend URL |
//! | POST | `/system/connections/release` | Release an in-flight connection count |
//! | GET | `/system/recoveries` | Recovery watch status |

pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use faaslane_resolver::FunctionResolver;
use faaslane_slo::SloController;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub resolver: Arc<FunctionResolver>,
    pub controller: Arc<SloController>,
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/system/slo-alert", post(handlers::slo_alert))
        .route("/functions/{name}/resolve", get(handlers::resolve_function))
        .route("/system/connections/release", post(handlers::release_connection))
        .route("/system/recoveries", get(handlers::recovery_status))
        .with_state(state)
}
