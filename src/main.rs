// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use axum::{routing::{get, post}, Router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::application::dataset_loader::DatasetLoader;
use crate::application::stream_engine::StreamEngine;
use crate::application::unit_converter::UnitConverter;
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::routing_source::RoutingDocumentSource;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    current_reading, health_check, history, live_events, reset_stream, start_stream,
    stats_events, stop_stream, stream_status, window_stats,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_app_config()?;
    tracing::debug!(?config, "configuration loaded");

    // Document sources and loader (infrastructure + application)
    let converter = UnitConverter::new(config.conversion.clone());
    let source = Arc::new(RoutingDocumentSource::new(config.conversion.sampling_interval_secs));
    let loader = DatasetLoader::new(converter, source);

    // Engines and services (application layer)
    let engine = Arc::new(StreamEngine::new(
        loader,
        Arc::new(SystemClock),
        config.stream.clone(),
    ));
    let dashboard = DashboardService::new(
        engine.clone(),
        &config.statistics,
        config.conversion.sampling_interval_secs,
    );
    dashboard.spawn_trend_tracking();

    if config.dataset.autostart {
        let engine = engine.clone();
        let location = config.dataset.location.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.start(&location).await {
                tracing::error!(location, error = %e, "autostart failed");
            }
        });
    }

    // Create application state
    let state = Arc::new(AppState {
        engine,
        dashboard,
        dataset: config.dataset.clone(),
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/stream/status", get(stream_status))
        .route("/stream/start", post(start_stream))
        .route("/stream/stop", post(stop_stream))
        .route("/stream/reset", post(reset_stream))
        .route("/stream/current", get(current_reading))
        .route("/stream/history", get(history))
        .route("/stream/stats", get(window_stats))
        .route("/stream/events", get(live_events))
        .route("/stream/stats/events", get(stats_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!(%addr, "starting weather-stream service");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
