// Main entry point - Dependency injection, background tasks and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};
use anyhow::Context;
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use tokio::sync::watch;
use tokio::task::JoinError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::channel_store::ChannelStore;
use crate::application::ingest_queue::ingest_queue;
use crate::application::push_listener::MeterPushListener;
use crate::application::query_service::{CombinedViewService, RangeQueryEngine};
use crate::application::sampling::SamplingLoop;
use crate::application::writer::PersistentWriter;
use crate::domain::channel::{
    Channels, METER_ENERGY, METER_POWER, SOLAR_POWER, SOLAR_POWER_BY_MINUTE,
};
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::mysql_store::MysqlChannelStore;
use crate::infrastructure::shelly_sensor::ShellySensor;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{combined_view, health_check, push_readings};

/// Log how a background task ended; true when it returned normally
fn report_task_exit(task: &str, result: Result<(), JoinError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("{} task failed: {}", task, e);
            false
        }
    }
}

/// Register the well-known channels once; every component receives the resolved ids
async fn resolve_channels(store: &dyn ChannelStore) -> anyhow::Result<Channels> {
    Ok(Channels {
        solar_power: store.resolve_channel_id(&SOLAR_POWER).await?,
        solar_power_by_minute: store.resolve_channel_id(&SOLAR_POWER_BY_MINUTE).await?,
        meter_power: store.resolve_channel_id(&METER_POWER).await?,
        meter_energy: store.resolve_channel_id(&METER_ENERGY).await?,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Create store (infrastructure layer)
    let store = MysqlChannelStore::connect(
        &config.database.url,
        Duration::from_secs(config.database.connect_timeout_secs),
    )
    .await?;
    store.ensure_schema().await?;
    let channels = resolve_channels(&store)
        .await
        .context("Failed to resolve channel registry")?;
    tracing::info!("Resolved channels: {:?}", channels);
    let store: Arc<dyn ChannelStore> = Arc::new(store);

    let sensor = Arc::new(ShellySensor::new(
        config.sensor.url.clone(),
        Duration::from_secs(config.sensor.timeout_secs),
    )?);

    // Ingestion pipeline
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (queue, receiver) = ingest_queue(config.writer.queue_capacity);

    let writer = PersistentWriter::new(
        store.clone(),
        Duration::from_secs(config.writer.retry_interval_secs),
    );
    let writer_handle = tokio::spawn(writer.run(receiver, shutdown_rx.clone()));

    let sampling = SamplingLoop::new(sensor, queue.clone(), &channels, &config.sampling);
    let sampling_handle = tokio::spawn(sampling.run(shutdown_rx.clone()));

    // Create application state
    let state = Arc::new(AppState {
        view_service: CombinedViewService::new(
            RangeQueryEngine::new(store.clone()),
            channels,
            config.query.clone(),
        ),
        push_listener: MeterPushListener::new(queue.clone(), &channels, &config.push.channels),
    });

    let origins: Vec<HeaderValue> = config
        .server
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/data", get(combined_view))
        .route("/push", post(push_readings))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!("Starting solar-telemetry service on {}", addr);

    let mut server_shutdown = shutdown_rx.clone();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = server_shutdown.wait_for(|stop| *stop).await;
    });
    let server_handle = tokio::spawn(async move { server.await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    shutdown_tx.send(true)?;

    report_task_exit("Sampling loop", sampling_handle.await);
    if let Err(e) = server_handle.await? {
        tracing::error!("HTTP server error: {}", e);
    }

    let drain_timeout = Duration::from_secs(config.writer.drain_timeout_secs);
    match tokio::time::timeout(drain_timeout, writer_handle).await {
        Ok(result) => {
            if report_task_exit("Persistent writer", result) {
                tracing::info!("Ingestion queue drained");
            }
        }
        Err(_) => tracing::warn!(
            "Writer did not drain within {}s, {} writes dropped so far",
            drain_timeout.as_secs(),
            queue.dropped()
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_report_task_exit_surfaces_panics() {
        let clean = tokio::spawn(async {});
        assert!(report_task_exit("clean", clean.await));

        let panicked = tokio::spawn(async { panic!("sensor state corrupted") });
        assert!(!report_task_exit("panicked", panicked.await));
    }
}
