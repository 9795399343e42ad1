//! HTTP Endpoints
//!
//! REST API for the front desk.

use axum::{
    extract::{Json, State},
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use front_desk_agent::CallSnapshot;

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::websocket::ws_handler;
use crate::ServerError;

const FALLBACK_ORIGIN: &str = "http://localhost:3000";

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.config.server.cors_origins,
        state.config.server.cors_enabled,
    );

    Router::new()
        // Call endpoints
        .route("/api/call", get(get_call))
        .route("/api/call/start", post(start_call))
        .route("/api/call/end", post(end_call))
        // Health check
        .route("/health", get(health_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        // WebSocket
        .route("/ws", get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns permissive layer (for dev)
/// - If cors_origins is empty, defaults to localhost:3000
/// - Otherwise, uses the configured origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::info!("No usable CORS origins configured, defaulting to {}", FALLBACK_ORIGIN);
        return CorsLayer::new()
            .allow_origin(HeaderValue::from_static(FALLBACK_ORIGIN))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Current call state
///
/// GET /api/call
async fn get_call(State(state): State<AppState>) -> Result<Json<CallSnapshot>, ServerError> {
    Ok(Json(state.session()?.snapshot()))
}

#[derive(Debug, Serialize)]
struct StartCallResponse {
    call_id: String,
}

/// Start a call on the attached client
///
/// POST /api/call/start
async fn start_call(
    State(state): State<AppState>,
) -> Result<Json<StartCallResponse>, ServerError> {
    let call_id = state.session()?.start_call().await?;
    Ok(Json(StartCallResponse { call_id }))
}

#[derive(Debug, Serialize)]
struct EndCallResponse {
    ended: bool,
}

/// End the call in progress
///
/// POST /api/call/end
async fn end_call(State(state): State<AppState>) -> Result<Json<EndCallResponse>, ServerError> {
    let ended = state.session()?.end_call().await?;
    Ok(Json(EndCallResponse { ended }))
}

/// Liveness and a summary of the call slot
///
/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let call_active = state
        .session()
        .map(|session| session.snapshot().is_call_active)
        .unwrap_or(false);

    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "client_attached": state.has_client(),
        "call_active": call_active,
    }))
}
