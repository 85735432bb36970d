//! Recovery watch — observes an alert's latency after a scale-out.
//!
//! Runs as a spawned background task decoupled from the alert
//! request: polls the alerting (function, node) p99 at a fixed
//! interval until it drops below the alert threshold, the deadline
//! lapses, or shutdown is signalled. Status is observable through
//! [`RecoveryTracker`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use faaslane_metrics::MetricSource;

use crate::flight::FlightGuard;

/// Where a recovery watch currently stands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RecoveryStatus {
    /// Waiting for p99 latency to drop below the bound.
    Waiting { threshold: f64 },
    /// Latency dropped below the bound.
    Recovered { observed: f64 },
    /// The deadline lapsed before latency recovered.
    DeadlineExceeded,
    /// Shutdown was signalled while waiting.
    Cancelled,
}

/// Observable status of recovery watches, keyed by `function@node`.
#[derive(Clone, Default)]
pub struct RecoveryTracker {
    inner: Arc<Mutex<HashMap<String, RecoveryStatus>>>,
}

impl RecoveryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&self, function: &str, node: &str, status: RecoveryStatus) {
        self.inner
            .lock()
            .expect("recovery tracker lock")
            .insert(key(function, node), status);
    }

    pub fn get(&self, function: &str, node: &str) -> Option<RecoveryStatus> {
        self.inner
            .lock()
            .expect("recovery tracker lock")
            .get(&key(function, node))
            .cloned()
    }

    /// All tracked watches and their current status.
    pub fn snapshot(&self) -> HashMap<String, RecoveryStatus> {
        self.inner.lock().expect("recovery tracker lock").clone()
    }
}

fn key(function: &str, node: &str) -> String {
    format!("{function}@{node}")
}

pub(crate) struct RecoveryWatch {
    pub source: Arc<dyn MetricSource>,
    pub tracker: RecoveryTracker,
    pub function: String,
    pub node: String,
    pub threshold: f64,
    pub interval: Duration,
    pub deadline: Duration,
}

/// Poll until recovery, deadline, or shutdown. Holds the alert's
/// flight guard so a new alert for the same pair is turned away
/// until this watch ends.
pub(crate) async fn run_watch(
    w: RecoveryWatch,
    guard: FlightGuard,
    mut shutdown: watch::Receiver<bool>,
) {
    let deadline = tokio::time::Instant::now() + w.deadline;
    let mut ticker = tokio::time::interval(w.interval);

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                warn!(
                    function = %w.function,
                    node = %w.node,
                    deadline_secs = w.deadline.as_secs(),
                    "latency did not recover before the deadline"
                );
                w.tracker.set(&w.function, &w.node, RecoveryStatus::DeadlineExceeded);
                break;
            }
            _ = shutdown.changed() => {
                w.tracker.set(&w.function, &w.node, RecoveryStatus::Cancelled);
                break;
            }
            _ = ticker.tick() => {
                match w.source.p99_latency(&w.function, &w.node).await {
                    Ok(p99) if p99 < w.threshold => {
                        info!(
                            function = %w.function,
                            node = %w.node,
                            p99,
                            threshold = w.threshold,
                            "latency recovered below the alert bound"
                        );
                        w.tracker.set(&w.function, &w.node, RecoveryStatus::Recovered { observed: p99 });
                        break;
                    }
                    Ok(p99) => {
                        debug!(function = %w.function, node = %w.node, p99, "latency still above the bound");
                    }
                    Err(e) => {
                        // Transient probe failures do not end the watch.
                        warn!(function = %w.function, node = %w.node, error = %e, "recovery probe failed");
                    }
                }
            }
        }
    }

    drop(guard);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_keys_by_function_and_node() {
        let tracker = RecoveryTracker::new();
        tracker.set("resize", "n1", RecoveryStatus::Waiting { threshold: 0.5 });
        tracker.set("resize", "n2", RecoveryStatus::DeadlineExceeded);

        assert_eq!(
            tracker.get("resize", "n1"),
            Some(RecoveryStatus::Waiting { threshold: 0.5 })
        );
        assert_eq!(tracker.get("resize", "n2"), Some(RecoveryStatus::DeadlineExceeded));
        assert_eq!(tracker.get("resize", "n3"), None);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains_key("resize@n1"));
    }

    #[test]
    fn status_serializes_with_state_tag() {
        let json = serde_json::to_string(&RecoveryStatus::Recovered { observed: 0.04 }).unwrap();
        assert!(json.contains(r#""state":"recovered""#));
        assert!(json.contains("0.04"));
    }
}
