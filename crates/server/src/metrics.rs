//! Observability Metrics
//!
//! Prometheus counters fed from the voice session event stream.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

use front_desk_agent::{EndReason, Intent, VoiceSessionEvent};

use crate::state::AppState;
use crate::ServerError;

/// Install the Prometheus recorder
///
/// Must be called once at startup before recording any metrics.
pub fn init_metrics() -> Result<PrometheusHandle, ServerError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Internal(format!("Failed to install Prometheus recorder: {}", e)))?;

    register_default_metrics();
    Ok(handle)
}

fn register_default_metrics() {
    counter!("front_desk_calls_started_total").absolute(0);
    counter!("front_desk_capture_restarts_total").absolute(0);
    for reason in [
        EndReason::Caller,
        EndReason::Farewell,
        EndReason::Disconnected,
        EndReason::Shutdown,
    ] {
        counter!("front_desk_calls_ended_total", "reason" => reason.as_str()).absolute(0);
    }
    for intent in Intent::ALL {
        counter!("front_desk_intents_total", "intent" => intent.as_str()).absolute(0);
    }
}

pub fn record_call_started() {
    counter!("front_desk_calls_started_total").increment(1);
}

pub fn record_call_ended(reason: EndReason) {
    counter!("front_desk_calls_ended_total", "reason" => reason.as_str()).increment(1);
}

pub fn record_intent(intent: Intent) {
    counter!("front_desk_intents_total", "intent" => intent.as_str()).increment(1);
}

pub fn record_capture_restart() {
    counter!("front_desk_capture_restarts_total").increment(1);
}

/// Update counters from session events until the session goes away
pub async fn record_session_events(events: broadcast::Receiver<VoiceSessionEvent>) {
    let mut events = BroadcastStream::new(events);

    while let Some(event) = events.next().await {
        match event {
            Ok(VoiceSessionEvent::CallStarted { .. }) => record_call_started(),
            Ok(VoiceSessionEvent::CallEnded { reason }) => record_call_ended(reason),
            Ok(VoiceSessionEvent::IntentClassified { intent }) => record_intent(intent),
            Ok(VoiceSessionEvent::CaptureRestarted) => record_capture_restart(),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Metrics recorder fell behind session events"),
        }
    }
}

/// Metrics endpoint handler
///
/// Returns Prometheus-formatted metrics.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics() {
        Some(handle) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            handle.render(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized".to_string(),
        ),
    }
}
