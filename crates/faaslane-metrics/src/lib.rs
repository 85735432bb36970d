//! faaslane-metrics — querying the external metrics aggregation service.
//!
//! The SLO controller never scrapes or samples anything itself; it
//! asks a Prometheus-compatible service on demand. This crate holds
//! the wire types for that request/response contract, the query
//! builders for the supported metric kinds, and [`MetricsClient`],
//! a reqwest-backed implementation of the [`MetricSource`] seam with
//! bounded retry for transient failures.

pub mod client;
pub mod query;
pub mod types;

pub use client::{MetricSource, MetricsClient, MetricsError};
pub use query::{p99_latency_query, MetricKind};
pub use types::{QueryData, QueryRequest, QueryResponse, QueryResult};
