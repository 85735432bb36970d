//! laned — the faaslane daemon.
//!
//! Single binary that assembles the routing and scaling core:
//! - Function resolver (random / round-robin / least-connections)
//! - SLO-violation controller with recovery watches
//! - Metrics query client
//! - REST API
//!
//! # Usage
//!
//! ```text
//! laned standalone --port 8081 --prometheus-url http://prometheus:9090/api/v1/query
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use faaslane_metrics::{MetricKind, MetricsClient};
use faaslane_resolver::{BalancingPolicy, FunctionResolver};
use faaslane_slo::{SloConfig, SloController};

#[derive(Parser)]
#[command(name = "laned", about = "faaslane daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run with an in-process cluster view (single node, no external
    /// control plane).
    Standalone {
        /// Port to listen on.
        #[arg(long, default_value = "8081")]
        port: u16,

        /// Namespace functions are deployed into.
        #[arg(long, default_value = "faaslane-fn")]
        default_namespace: String,

        /// Namespaces the resolver refuses to route into.
        #[arg(long, value_delimiter = ',', default_value = "kube-system")]
        reserved_namespaces: Vec<String>,

        /// Load-balancing policy: random, round-robin or least-connections.
        #[arg(long, default_value = "round-robin")]
        lb_policy: BalancingPolicy,

        /// Base URL of the metrics query endpoint.
        #[arg(long, default_value = "http://127.0.0.1:9090/api/v1/query")]
        prometheus_url: String,

        /// Metric used to rank sibling functions: qps or cpu.
        #[arg(long, default_value = "qps")]
        metric: MetricKind,

        /// Upper bound on concurrent sibling metric queries.
        #[arg(long, default_value = "8")]
        fanout_limit: usize,

        /// Recovery poll interval in seconds.
        #[arg(long, default_value = "5")]
        recovery_interval: u64,

        /// Recovery watch deadline in seconds.
        #[arg(long, default_value = "300")]
        recovery_deadline: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,laned=debug,faaslane=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Standalone {
            port,
            default_namespace,
            reserved_namespaces,
            lb_policy,
            prometheus_url,
            metric,
            fanout_limit,
            recovery_interval,
            recovery_deadline,
        } => {
            run_standalone(StandaloneOptions {
                port,
                default_namespace,
                reserved_namespaces,
                lb_policy,
                prometheus_url,
                metric,
                fanout_limit,
                recovery_interval: Duration::from_secs(recovery_interval),
                recovery_deadline: Duration::from_secs(recovery_deadline),
            })
            .await
        }
    }
}

struct StandaloneOptions {
    port: u16,
    default_namespace: String,
    reserved_namespaces: Vec<String>,
    lb_policy: BalancingPolicy,
    prometheus_url: String,
    metric: MetricKind,
    fanout_limit: usize,
    recovery_interval: Duration,
    recovery_deadline: Duration,
}

async fn run_standalone(opts: StandaloneOptions) -> anyhow::Result<()> {
    info!("faaslane daemon starting in standalone mode");

    // ── Initialize subsystems ──────────────────────────────────

    // In-process cluster view. A real control-plane client plugs in
    // through the same ClusterClient seam.
    let cluster = Arc::new(faaslane_cluster::InMemoryCluster::new());
    info!("in-memory cluster view initialized");

    // Function resolver.
    let resolver = Arc::new(
        FunctionResolver::new(cluster.clone(), &opts.default_namespace, opts.lb_policy)
            .with_reserved_namespaces(opts.reserved_namespaces),
    );
    info!(policy = %opts.lb_policy, namespace = %opts.default_namespace, "resolver initialized");

    // Metrics query client.
    let metrics = Arc::new(MetricsClient::new(&opts.prometheus_url));
    info!(url = %opts.prometheus_url, "metrics client initialized");

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // SLO controller.
    let controller = Arc::new(SloController::new(
        cluster,
        metrics,
        SloConfig {
            namespace: opts.default_namespace,
            metric: opts.metric,
            fanout_limit: opts.fanout_limit,
            recovery_interval: opts.recovery_interval,
            recovery_deadline: opts.recovery_deadline,
        },
        shutdown_rx,
    ));
    info!(metric = %opts.metric, fanout_limit = opts.fanout_limit, "SLO controller initialized");

    // ── Start API server ───────────────────────────────────────

    let router = faaslane_api::build_router(faaslane_api::ApiState {
        resolver,
        controller,
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], opts.port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    info!("faaslane daemon stopped");
    Ok(())
}
