//! Tether Agent - offline mutation queue for local-first clients.
//!
//! Runs the local API, the reachability probe, the connectivity monitor and
//! the background sync scheduler against one SQLite database.

use std::sync::Arc;

use reqwest::Url;
use tether_agent::config::Config;
use tether_agent::connectivity::{self, ConnectivityMonitor, Reachability};
use tether_agent::db;
use tether_agent::queue::OperationQueue;
use tether_agent::scheduler::SyncScheduler;
use tether_agent::snapshot_store::LocalSnapshotStore;
use tether_agent::transport::{HttpTransport, Transport};
use tether_agent::{build_router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tether_agent=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(
        remote = %config.remote_base_url,
        "Starting Tether Agent on {}:{}",
        config.host,
        config.port
    );

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    let http = HttpTransport::new(
        &config.remote_base_url,
        config.auth_token.clone(),
        config.request_timeout,
    )?;
    let probe_client = http.client().clone();
    let transport: Arc<dyn Transport> = Arc::new(http);

    let queue = OperationQueue::new_shared(pool.clone(), transport.clone(), config.retry_policy());
    let snapshots = LocalSnapshotStore::new(pool);
    let reachability = Reachability::new_shared(false);

    tracing::info!(pending = queue.queue_length().await, "Operation queue loaded");

    let monitor = ConnectivityMonitor::new_shared(reachability.clone(), queue.clone());
    monitor.initialize();

    let probe_url = Url::parse(&config.probe_url())?;
    let probe = tokio::spawn(connectivity::probe(
        reachability.clone(),
        probe_client,
        probe_url,
        config.probe_interval,
    ));

    let scheduler = tokio::spawn(
        SyncScheduler {
            queue: queue.clone(),
            store: snapshots.clone(),
            transport,
            reachability: reachability.clone(),
            replay_interval: config.replay_interval,
            snapshot_interval: config.snapshot_refresh,
        }
        .run(),
    );

    // Build application state
    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState {
        queue,
        snapshots,
        reachability,
        config: Arc::new(config),
    };
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Agent listening on {}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    probe.abort();
    scheduler.abort();
    monitor.cleanup();
    tracing::info!("Agent stopped");

    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
