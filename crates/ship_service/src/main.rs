//! Ship service entry point.
//!
//! Wires the feed client, ingest workers, spatial cache, janitor and HTTP
//! API together, then waits for Ctrl+C and stops them in dependency order.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aisstream::AisHandler;
use anyhow::{Context, Result};
use clap::Parser;
use common::{ControlCommand, WsManager, WsManagerConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use ship_service::{
    create_router, render_index, AppState, Config, IngestPool, Janitor, Ships, SpatialCache,
};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Drain window for in-flight HTTP requests at shutdown.
const HTTP_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(name = "seawatch", about = "Live AIS vessel tracker")]
struct Args {
    /// Path to the JSON config file.
    #[arg(short = 'c', long, value_name = "FILE")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config).context("could not load config file")?;

    if let Some(addr) = config.server.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("could not install Prometheus exporter")?;
        info!("Prometheus metrics available at http://{}/metrics", addr);
    }

    // A broken index template must fail here, not on the first request.
    let index_html = render_index(&config.server.html_dir, &config.google.api_key)?;

    let ships = Arc::new(Ships::new());
    let cache = Arc::new(SpatialCache::new());

    // Feed client. The raw channel is a rendezvous channel: backpressure
    // from the workers lands on the websocket read loop.
    let (raw_tx, raw_rx) = flume::bounded::<Vec<u8>>(0);
    let (feed_quit_tx, feed_quit_rx) = mpsc::channel::<ControlCommand>(1);

    let handler = AisHandler::new(config.aisstream.clone(), raw_tx, "ais-feed".to_string());
    let ws_config = WsManagerConfig {
        feed_label: "aisstream".to_string(),
        ..Default::default()
    };
    let manager = WsManager::new(handler, ws_config, feed_quit_rx, "ais-feed".to_string());
    let feed_handle = tokio::spawn(async move {
        if let Err(e) = manager.run().await {
            error!("feed client failed: {:?}", e);
        }
    });

    // Ingest workers.
    let pool = IngestPool::spawn(
        config.ingest.worker_count,
        ships.clone(),
        raw_rx,
        config.ingest.ship_history,
    );

    // Spatial cache.
    let (cache_quit_tx, cache_quit_rx) = mpsc::channel::<ControlCommand>(1);
    let cache_handle = tokio::spawn(cache.clone().run(
        ships.clone(),
        Duration::from_secs(config.ingest.cache_refresh_secs),
        cache_quit_rx,
    ));

    // Janitor.
    let (janitor_quit_tx, janitor_quit_rx) = mpsc::channel::<ControlCommand>(1);
    let janitor = Janitor::new(config.janitor.clone(), ships.clone());
    let janitor_handle = tokio::spawn(janitor.run(janitor_quit_rx));

    // HTTP server.
    let state = AppState {
        ships: ships.clone(),
        cache: cache.clone(),
        index_html,
        static_dir: config.server.html_dir.join("static"),
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("could not bind {}", config.server.listen_addr))?;
    info!("HTTP API listening on http://{}", config.server.listen_addr);

    let (http_quit_tx, http_quit_rx) = oneshot::channel::<()>();
    let server_handle = tokio::spawn(async move {
        let shutdown = async {
            let _ = http_quit_rx.await;
        };
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("http server failed: {:?}", e);
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("could not listen for shutdown signal")?;
    info!("received shutdown signal");

    // Stop order matters: the HTTP surface drains first, then the feed
    // client, so the worker channel empties before the workers stop, then
    // the background sweepers.
    let _ = http_quit_tx.send(());
    if timeout(HTTP_DRAIN_TIMEOUT, server_handle).await.is_err() {
        warn!("http server did not drain within {:?}", HTTP_DRAIN_TIMEOUT);
    }

    let _ = feed_quit_tx.send(ControlCommand::Shutdown).await;
    let _ = feed_handle.await;

    pool.shutdown().await;

    let _ = janitor_quit_tx.send(ControlCommand::Shutdown).await;
    let _ = janitor_handle.await;

    let _ = cache_quit_tx.send(ControlCommand::Shutdown).await;
    let _ = cache_handle.await;

    info!("seawatch stopped");
    Ok(())
}
