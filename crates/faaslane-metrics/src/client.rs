//! HTTP client for the metrics query service.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::query::{p99_latency_query, MetricKind};
use crate::types::{QueryRequest, QueryResponse};

/// Errors from querying the metrics service.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metrics request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("metrics service returned HTTP {status}")]
    Status { status: u16 },

    #[error("metrics query rejected: {message}")]
    Query { message: String },

    #[error("query returned an empty result set")]
    EmptyResult,

    #[error("unparsable sample value {value:?}")]
    Parse { value: String },
}

impl MetricsError {
    /// Whether a retry could plausibly succeed.
    fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status } => *status >= 500,
            _ => false,
        }
    }
}

/// The metric seam the SLO controller consumes.
///
/// [`MetricsClient`] implements it over HTTP; tests substitute stubs.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Current value of `kind` for one function on one node.
    async fn sample(&self, kind: MetricKind, function: &str, node: &str)
        -> Result<f64, MetricsError>;

    /// Current p99 latency for one function on one node.
    async fn p99_latency(&self, function: &str, node: &str) -> Result<f64, MetricsError>;
}

/// Queries a Prometheus-compatible service over HTTP.
///
/// Transient failures (transport errors, 5xx) are retried with
/// exponential backoff up to a fixed attempt budget; malformed
/// payloads and rejected queries fail immediately.
pub struct MetricsClient {
    base_url: String,
    client: reqwest::Client,
    request_timeout: Duration,
    max_attempts: u32,
    backoff: Duration,
}

impl MetricsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            request_timeout: Duration::from_secs(5),
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }

    /// Override the retry budget and base backoff.
    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff = backoff;
        self
    }

    /// Override the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Run an instant query, retrying transient failures.
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, MetricsError> {
        let mut attempt = 0u32;
        loop {
            match self.try_query(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt + 1 < self.max_attempts => {
                    let delay = self.backoff * 2u32.pow(attempt);
                    warn!(
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "metrics query failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Run a query and parse the first result's value.
    ///
    /// Only the first result in the list is consulted.
    pub async fn first_value(&self, request: &QueryRequest) -> Result<f64, MetricsError> {
        let response = self.query(request).await?;
        let first = response.data.result.first().ok_or(MetricsError::EmptyResult)?;
        first
            .value
            .1
            .parse()
            .map_err(|_| MetricsError::Parse {
                value: first.value.1.clone(),
            })
    }

    async fn try_query(&self, request: &QueryRequest) -> Result<QueryResponse, MetricsError> {
        let response = self
            .client
            .post(&self.base_url)
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetricsError::Status {
                status: status.as_u16(),
            });
        }

        let parsed: QueryResponse = response.json().await?;
        if parsed.status != "success" {
            return Err(MetricsError::Query {
                message: parsed
                    .error
                    .unwrap_or_else(|| "no error detail".to_string()),
            });
        }
        Ok(parsed)
    }
}

#[async_trait]
impl MetricSource for MetricsClient {
    async fn sample(
        &self,
        kind: MetricKind,
        function: &str,
        node: &str,
    ) -> Result<f64, MetricsError> {
        self.first_value(&kind.query(function, node)).await
    }

    async fn p99_latency(&self, function: &str, node: &str) -> Result<f64, MetricsError> {
        self.first_value(&p99_latency_query(function, node)).await
    }
}
