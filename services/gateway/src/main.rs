//! Provider Gateway
//!
//! Single-binary service that fronts a pool of LLM provider accounts:
//! 1. Loads provider records from a JSON pool document
//! 2. Round-robin selects an available record per generate request
//! 3. Probes record health in the background and persists state changes
//! 4. Exposes admin endpoints for record management

mod admin;
mod config;
mod error;
mod metrics;
mod resolver;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metrics_exporter_prometheus::PrometheusHandle;

use backend::HttpBackendFactory;
use provider_pool::{PoolStore, load_document, spawn_flusher, spawn_health_sweep};

use crate::admin::AdminState;
use crate::config::Config;
use crate::error::ApiError;
use crate::resolver::Resolver;

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    store: Arc<PoolStore>,
    resolver: Arc<Resolver>,
    prometheus: PrometheusHandle,
    started_at: Instant,
}

/// Build the axum router with all routes and shared state.
///
/// The admin router is merged in with its own state; the concurrency
/// limit covers both surfaces.
fn build_router(state: AppState, admin_state: AdminState, max_connections: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/generate/{provider_type}", post(generate_handler))
        .with_state(state)
        .merge(admin::build_admin_router(admin_state))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting provider-gateway");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        pool_file = %config.pool.file.display(),
        provider_types = config.providers.len(),
        admin_token = config.server.admin_token.is_some(),
        "configuration loaded"
    );

    let document = load_document(&config.pool.file)
        .await
        .with_context(|| format!("failed to load pool file {}", config.pool.file.display()))?;

    let (store, flush_rx) = PoolStore::new(config.pool.max_error_count);
    store.initialize(document).await;
    let store = Arc::new(store);

    let factory = Arc::new(HttpBackendFactory::new().context("failed to build http client")?);
    let base = config.base_configs();

    spawn_flusher(
        store.clone(),
        config.pool.file.clone(),
        config.pool.save_debounce(),
        flush_rx,
    );
    spawn_health_sweep(
        store.clone(),
        factory.clone(),
        base.clone(),
        config.pool.health_check_interval(),
    );

    let resolver = Arc::new(Resolver::new(store.clone(), factory.clone(), base.clone()));

    let app_state = AppState {
        store: store.clone(),
        resolver,
        prometheus: prometheus_handle,
        started_at: Instant::now(),
    };
    let admin_state = AdminState {
        store,
        factory,
        base,
        token: config
            .server
            .admin_token
            .as_ref()
            .map(|t| Arc::from(t.expose().as_str())),
    };

    let app = build_router(app_state, admin_state, config.server.max_connections);

    let listener = TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.server.listen_addr))?;

    info!(addr = %config.server.listen_addr, "accepting requests");

    // Graceful shutdown: stop accepting on SIGTERM/SIGINT and drain
    // in-flight requests; the flusher writes any pending pool state when
    // the runtime drops it.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match server_handle.await {
        Ok(Ok(())) => info!("all in-flight requests drained"),
        Ok(Err(e)) => error!(error = %e, "server error during shutdown"),
        Err(e) => error!(error = %e, "server task panicked"),
    }

    info!("shutdown complete");
    Ok(())
}

/// Health endpoint: pool availability summary plus uptime.
/// Returns 200 for healthy or degraded, 503 only when no record in any
/// pool is available.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut body = state.store.summary().await;
    body["uptime_seconds"] = serde_json::json!(state.started_at.elapsed().as_secs());

    let status_code = if body["status"] == "unhealthy" {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    } else {
        axum::http::StatusCode::OK
    };

    (
        status_code,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint — returns metrics in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// POST /api/generate/{provider_type} — resolve a capability and run one
/// generate call. Body: `{"model": "...", "request": {...}}`.
async fn generate_handler(
    State(state): State<AppState>,
    Path(provider_type): Path<String>,
    axum::Json(body): axum::Json<serde_json::Value>,
) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    let started = Instant::now();

    let response = match generate(&state, &provider_type, &body, &request_id).await {
        Ok(value) => (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            value.to_string(),
        )
            .into_response(),
        Err(e) => e.into_response(),
    };

    metrics::record_request(
        &provider_type,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

async fn generate(
    state: &AppState,
    provider_type: &str,
    body: &serde_json::Value,
    request_id: &str,
) -> std::result::Result<serde_json::Value, ApiError> {
    let Some(model) = body.get("model").and_then(serde_json::Value::as_str) else {
        return Err(ApiError::BadRequest("model is required".into()));
    };
    let request = body
        .get("request")
        .cloned()
        .unwrap_or(serde_json::Value::Null);

    let resolved = state.resolver.resolve(provider_type, Some(model)).await?;

    match resolved.capability.generate_content(model, &request).await {
        Ok(value) => {
            debug!(request_id, provider_type, model, "generate succeeded");
            Ok(value)
        }
        Err(e) => {
            // Live-traffic failures count against the record the same as
            // probe failures
            if let Some(uuid) = &resolved.record_uuid {
                state
                    .resolver
                    .report_failure(provider_type, uuid, Some(&e.to_string()))
                    .await;
            }
            debug!(request_id, provider_type, model, error = %e, "generate failed");
            Err(ApiError::Backend(e))
        }
    }
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
