//! SLO-violation controller.
//!
//! One run per alert: rank the functions co-located with the
//! alerting pod by their current consumption of the configured
//! metric, pick the heaviest as the probable cause of contention,
//! and scale it out by one replica if the cluster still has room.
//! A run moves `FanOutQuerying → Ranking → ScaleDecision →
//! {ScaledWaitingForRecovery | NoActionTaken}`; the recovery wait
//! lives in a spawned background watch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use faaslane_cluster::ClusterClient;
use faaslane_metrics::{MetricKind, MetricSource};

use crate::error::SloError;
use crate::flight::FlightTable;
use crate::rank::{MetricRankHeap, MetricSample};
use crate::recovery::{run_watch, RecoveryStatus, RecoveryTracker, RecoveryWatch};

/// Alert label carrying the alerting node's name.
pub const LABEL_NODE: &str = "node";
/// Alert label carrying the name of the pod that raised the alert.
pub const LABEL_POD: &str = "pod";
/// Alert label carrying the alerting function's name.
pub const LABEL_FUNCTION: &str = "function";
/// Alert label carrying the latency bound as a string-encoded float.
pub const LABEL_LATENCY_LIMIT: &str = "latency_upper_limit";

/// An inbound SLO-violation alert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SloAlert {
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

/// Validated alert fields.
struct AlertContext {
    node: String,
    pod: String,
    function: String,
    latency_upper_limit: f64,
}

impl AlertContext {
    fn parse(alert: &SloAlert) -> Result<Self, SloError> {
        let label = |name: &str| -> Result<String, SloError> {
            alert
                .labels
                .get(name)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| SloError::MalformedAlert(format!("missing label {name:?}")))
        };

        let raw_limit = label(LABEL_LATENCY_LIMIT)?;
        let latency_upper_limit = raw_limit.parse().map_err(|_| {
            SloError::MalformedAlert(format!("unparsable latency_upper_limit {raw_limit:?}"))
        })?;

        Ok(Self {
            node: label(LABEL_NODE)?,
            pod: label(LABEL_POD)?,
            function: label(LABEL_FUNCTION)?,
            latency_upper_limit,
        })
    }
}

/// What a completed alert run decided.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AlertOutcome {
    /// The target function gained one replica; a recovery watch is
    /// running in the background.
    ScaledUp { function: String, replicas: u32 },
    /// Replica count already matches the eligible-node capacity.
    /// Traffic shaping for this case is an explicit extension point.
    Saturated {
        function: String,
        replicas: u32,
        eligible_nodes: u32,
    },
    /// No sibling pods to rank on the alerting node.
    NoCandidates,
    /// A run for the same (function, node) pair is already active.
    InFlight { function: String, node: String },
}

/// Controller tuning.
#[derive(Debug, Clone)]
pub struct SloConfig {
    /// Namespace the function deployments live in.
    pub namespace: String,
    /// Metric used to rank sibling functions.
    pub metric: MetricKind,
    /// Upper bound on concurrent sibling metric queries.
    pub fanout_limit: usize,
    /// Recovery poll interval.
    pub recovery_interval: Duration,
    /// Deadline for the recovery watch.
    pub recovery_deadline: Duration,
}

impl Default for SloConfig {
    fn default() -> Self {
        Self {
            namespace: "faaslane-fn".to_string(),
            metric: MetricKind::Qps,
            fanout_limit: 8,
            recovery_interval: Duration::from_secs(5),
            recovery_deadline: Duration::from_secs(300),
        }
    }
}

/// Reacts to latency-SLO violations with single-step scale-out
/// decisions.
pub struct SloController {
    cluster: Arc<dyn ClusterClient>,
    metrics: Arc<dyn MetricSource>,
    config: SloConfig,
    flights: FlightTable,
    recoveries: RecoveryTracker,
    shutdown: watch::Receiver<bool>,
}

impl SloController {
    pub fn new(
        cluster: Arc<dyn ClusterClient>,
        metrics: Arc<dyn MetricSource>,
        config: SloConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            cluster,
            metrics,
            config,
            flights: FlightTable::default(),
            recoveries: RecoveryTracker::new(),
            shutdown,
        }
    }

    /// Status of past and active recovery watches.
    pub fn recoveries(&self) -> &RecoveryTracker {
        &self.recoveries
    }

    /// Run the decision pipeline for one alert.
    ///
    /// Returns as soon as the scale decision is applied; recovery is
    /// watched by a spawned background task.
    pub async fn handle_alert(&self, alert: &SloAlert) -> Result<AlertOutcome, SloError> {
        let ctx = AlertContext::parse(alert)?;

        let Some(guard) = self.flights.try_acquire(&ctx.function, &ctx.node) else {
            debug!(
                function = %ctx.function,
                node = %ctx.node,
                "alert already being handled, ignoring"
            );
            return Ok(AlertOutcome::InFlight {
                function: ctx.function,
                node: ctx.node,
            });
        };

        let pods = self.cluster.pods_on_node(&ctx.node).await?;
        let siblings: Vec<_> = pods.into_iter().filter(|p| p.name != ctx.pod).collect();
        if siblings.is_empty() {
            info!(node = %ctx.node, pod = %ctx.pod, "no sibling pods to rank");
            return Ok(AlertOutcome::NoCandidates);
        }

        // Fan out one metric query per sibling, bounded by the
        // configured concurrency limit. The join below is the
        // barrier: ranking starts only once every task finished.
        let heap = Arc::new(MetricRankHeap::new());
        let semaphore = Arc::new(Semaphore::new(self.config.fanout_limit.max(1)));
        let mut tasks: JoinSet<Result<(), String>> = JoinSet::new();
        let mut launched = 0usize;

        for pod in siblings {
            let Some(function) = pod.function().map(str::to_string) else {
                warn!(pod = %pod.name, "sibling pod carries no function label, skipping");
                continue;
            };
            let heap = heap.clone();
            let semaphore = semaphore.clone();
            let source = self.metrics.clone();
            let kind = self.config.metric;
            let node = ctx.node.clone();
            let pod_name = pod.name;

            launched += 1;
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.map_err(|e| e.to_string())?;
                let value = source
                    .sample(kind, &function, &node)
                    .await
                    .map_err(|e| format!("pod {pod_name}: {e}"))?;
                heap.push(MetricSample::new(function, pod_name, value));
                Ok(())
            });
        }

        if launched == 0 {
            info!(node = %ctx.node, "no labelled sibling pods to rank");
            return Ok(AlertOutcome::NoCandidates);
        }

        let mut failed = 0usize;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(message)) => {
                    failed += 1;
                    warn!(%message, "sibling metric query failed");
                }
                Err(e) => {
                    failed += 1;
                    warn!(error = %e, "sibling metric task aborted");
                }
            }
        }

        // A failed sibling does not abort the run; only an empty heap
        // leaves nothing to decide on.
        let Some(target) = heap.top() else {
            return Err(SloError::MetricsUnavailable { failed });
        };
        if failed > 0 {
            warn!(failed, ranked = heap.len(), "ranking over partial results");
        }
        info!(
            function = %target.function,
            pod = %target.pod,
            value = target.value,
            metric = %self.config.metric,
            "scale-out candidate selected"
        );

        let deployment = self
            .cluster
            .deployment(&self.config.namespace, &target.function)
            .await?;
        let nodes = self.cluster.nodes().await?;
        let eligible = nodes.iter().filter(|n| n.is_eligible()).count() as u32;

        if deployment.replicas >= eligible {
            info!(
                function = %target.function,
                replicas = deployment.replicas,
                eligible,
                "replica count at eligible-node capacity, not scaling"
            );
            return Ok(AlertOutcome::Saturated {
                function: target.function,
                replicas: deployment.replicas,
                eligible_nodes: eligible,
            });
        }

        let replicas = deployment.replicas + 1;
        self.cluster
            .set_replicas(&self.config.namespace, &target.function, replicas)
            .await?;
        info!(
            function = %target.function,
            from = deployment.replicas,
            to = replicas,
            eligible,
            "scaled out by one replica"
        );

        // Watch the alerting pair for recovery in the background,
        // keeping the flight guard until the watch ends.
        self.recoveries.set(
            &ctx.function,
            &ctx.node,
            RecoveryStatus::Waiting {
                threshold: ctx.latency_upper_limit,
            },
        );
        let recovery = RecoveryWatch {
            source: self.metrics.clone(),
            tracker: self.recoveries.clone(),
            function: ctx.function,
            node: ctx.node,
            threshold: ctx.latency_upper_limit,
            interval: self.config.recovery_interval,
            deadline: self.config.recovery_deadline,
        };
        tokio::spawn(run_watch(recovery, guard, self.shutdown.clone()));

        Ok(AlertOutcome::ScaledUp {
            function: target.function,
            replicas,
        })
    }
}
