//! Application State
//!
//! Shared state across all handlers. At most one client is attached at a
//! time; its voice session is the only call in the process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use front_desk_agent::{EndReason, VoiceSession, VoiceSessionConfig, VoiceSessionHandle};
use front_desk_config::Settings;

use crate::metrics::record_session_events;
use crate::websocket::{ServerMessage, WsCapture, WsSynthesis};
use crate::ServerError;

/// The connected browser and the session it drives
#[derive(Debug, Clone)]
pub struct AttachedClient {
    pub id: u64,
    pub session: VoiceSessionHandle,
}

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    client: Arc<Mutex<Option<AttachedClient>>>,
    next_client_id: Arc<AtomicU64>,
    metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Settings) -> Self {
        Self {
            config: Arc::new(config),
            client: Arc::new(Mutex::new(None)),
            next_client_id: Arc::new(AtomicU64::new(1)),
            metrics: None,
        }
    }

    /// Serve Prometheus metrics from this handle
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn metrics(&self) -> Option<&PrometheusHandle> {
        self.metrics.as_ref()
    }

    /// Session of the attached client
    pub fn session(&self) -> Result<VoiceSessionHandle, ServerError> {
        self.client
            .lock()
            .as_ref()
            .map(|client| client.session.clone())
            .ok_or(ServerError::NoClient)
    }

    pub fn has_client(&self) -> bool {
        self.client.lock().is_some()
    }

    /// Attach a client whose collaborator commands go to `outbound`
    ///
    /// Spawns the voice session. Fails with `ClientAttached` when another
    /// client holds the slot.
    pub fn attach(
        &self,
        outbound: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<AttachedClient, ServerError> {
        let mut slot = self.client.lock();
        if slot.is_some() {
            return Err(ServerError::ClientAttached);
        }

        let speech = &self.config.speech;
        let session = VoiceSession::spawn(
            VoiceSessionConfig::from_settings(&self.config),
            WsCapture::new(outbound.clone(), speech.capture()),
            WsSynthesis::new(outbound),
        );
        tokio::spawn(record_session_events(session.subscribe()));

        let client = AttachedClient {
            id: self.next_client_id.fetch_add(1, Ordering::Relaxed),
            session,
        };
        *slot = Some(client.clone());

        tracing::info!(client_id = client.id, "Client attached");
        Ok(client)
    }

    /// Release the slot held by `client_id`, ending its call
    pub async fn detach(&self, client_id: u64) {
        let client = {
            let mut slot = self.client.lock();
            match slot.as_ref() {
                Some(client) if client.id == client_id => slot.take(),
                _ => None,
            }
        };

        if let Some(client) = client {
            close_session(&client.session).await;
            tracing::info!(client_id, "Client detached");
        }
    }

    /// Release whatever client is attached
    pub async fn detach_all(&self) {
        let client = self.client.lock().take();
        if let Some(client) = client {
            close_session(&client.session).await;
            tracing::info!(client_id = client.id, "Client detached on shutdown");
        }
    }
}

async fn close_session(session: &VoiceSessionHandle) {
    if let Err(e) = session.end_call_with(EndReason::Disconnected).await {
        tracing::debug!(error = %e, "Session already closed");
    }
    if let Err(e) = session.shutdown().await {
        tracing::warn!(error = %e, "Voice session did not shut down cleanly");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_single_client_slot() {
        let state = AppState::new(Settings::default());
        assert!(matches!(state.session(), Err(ServerError::NoClient)));

        let (tx, _rx) = mpsc::unbounded_channel();
        let first = state.attach(tx.clone()).unwrap();
        assert!(state.has_client());
        assert!(matches!(state.attach(tx.clone()), Err(ServerError::ClientAttached)));

        // a stale id does not release the slot
        state.detach(first.id + 1).await;
        assert!(state.has_client());

        state.detach(first.id).await;
        assert!(!state.has_client());
        assert!(first.session.is_closed());

        let second = state.attach(tx).unwrap();
        assert_ne!(second.id, first.id);
        state.detach_all().await;
        assert!(!state.has_client());
    }
}
