//! faaslane-slo — reacting to latency-SLO violations.
//!
//! An alert names a node, the pod and function that violated their
//! latency bound, and the bound itself. The controller ranks the
//! functions co-located on that node by their current consumption of
//! one configured metric, treats the heaviest as the probable cause
//! of contention, and scales it out by exactly one replica when the
//! cluster still has an eligible node to absorb it. A background
//! watch then observes the alerting pair until its p99 latency drops
//! back below the bound.

pub mod controller;
pub mod error;
pub mod rank;
pub mod recovery;

mod flight;

pub use controller::{
    AlertOutcome, SloAlert, SloConfig, SloController, LABEL_FUNCTION, LABEL_LATENCY_LIMIT,
    LABEL_NODE, LABEL_POD,
};
pub use error::SloError;
pub use rank::{MetricRankHeap, MetricSample};
pub use recovery::{RecoveryStatus, RecoveryTracker};
