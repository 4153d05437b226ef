//! Health and metrics endpoints served alongside the scanner, trader and ingest binaries

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

use crate::metrics::Metrics;

pub const SERVICE_NAME: &str = "jtrader-signal-engine";

#[derive(Clone)]
pub struct AppState {
    /// Which engine this process runs (`scanner`, `trader`, `ingest`).
    pub component: &'static str,
    pub metrics: Arc<Metrics>,
    pub start_time: Arc<Instant>,
}

impl AppState {
    pub fn new(component: &'static str, metrics: Arc<Metrics>) -> Self {
        Self {
            component,
            metrics,
            start_time: Arc::new(Instant::now()),
        }
    }
}

/// Liveness plus a snapshot of the engine counters. Answering at all means healthy.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let metrics = &state.metrics;
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "component": state.component,
        "uptime_seconds": state.start_time.elapsed().as_secs(),
        "signals_emitted": metrics.signals_emitted_total.get() as u64,
        "active_traders": metrics.active_traders.get() as i64,
    }))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    state.metrics.export().map_err(|e| {
        tracing::error!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Keeps the in-flight gauge balanced even if the handler future is dropped.
struct InFlight(Arc<Metrics>);

impl InFlight {
    fn enter(metrics: Arc<Metrics>) -> Self {
        metrics.http_requests_in_flight.inc();
        Self(metrics)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.http_requests_in_flight.dec();
    }
}

async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = {
        let _in_flight = InFlight::enter(state.metrics.clone());
        next.run(request).await
    };

    let elapsed = started.elapsed();
    state.metrics.http_requests_total.inc();
    state
        .metrics
        .http_request_duration_seconds
        .observe(elapsed.as_secs_f64());

    let status = response.status();
    if status.is_server_error() {
        tracing::error!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = elapsed.as_millis() as u64,
            "HTTP request error"
        );
    }

    response
}

pub fn create_router(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(axum::middleware::from_fn_with_state(state.clone(), track_requests))
        .layer(CorsLayer::permissive());

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(middleware)
        .with_state(state)
}

/// Serve `state` on `port` until the process exits.
pub async fn start_server(port: u16, state: AppState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let component = state.component;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!(port = port, component = component, "HTTP server listening on port {}", port);
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}
