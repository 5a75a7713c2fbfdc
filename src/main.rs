//! UptimeX - availability dashboard backend.

use uptimex::config::{Config, SourceConfig};
use uptimex::scheduler::RefreshScheduler;
use uptimex::store::{HttpTickSource, SqliteTickStore, TickSource};
use uptimex::web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("uptimex=info".parse()?))
        .init();

    // Load configuration
    let cfg = Config::load()?;

    let source: Arc<dyn TickSource> = match &cfg.source {
        SourceConfig::Http {
            api_url,
            auth_token,
            timeout,
        } => Arc::new(HttpTickSource::new(api_url, auth_token.clone(), *timeout)?),
        SourceConfig::Sqlite { db_path } => Arc::new(SqliteTickStore::new(db_path)?),
    };

    tracing::info!("Starting UptimeX on port {}...", cfg.http_port);
    tracing::info!("Reading ticks from {}", source.description());
    tracing::info!(
        "Refreshing every {:?} ({} windows of {}s)",
        cfg.refresh_interval,
        cfg.aggregation.window_count,
        cfg.aggregation.window_size.num_seconds()
    );

    // Start the refresh loop
    let scheduler = RefreshScheduler::new(cfg.refresh_interval, cfg.aggregation);
    let handle = scheduler.start(move || {
        let source = source.clone();
        async move { source.fetch_all_endpoints().await }
    });

    // Serve until the listener fails or we are interrupted
    let server = Server::new(cfg.http_port, handle.subscribe());
    tokio::select! {
        result = server.start() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    handle.cancel();
    Ok(())
}
