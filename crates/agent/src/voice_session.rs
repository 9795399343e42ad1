//! Voice Session Driver
//!
//! Runs a [`CallController`] on its own task so callers can talk to it from
//! anywhere through a cloneable handle.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  commands   ┌──────────────────┐  start/stop   ┌─────────────┐
//! │    Handle    │────────────▶│  session task    │──────────────▶│   Capture   │
//! │ (UI, server) │             │ (CallController) │  speak/cancel ┌─────────────┐
//! └──────────────┘             │                  │──────────────▶│  Synthesis  │
//!        ▲                     └──────────────────┘               └─────────────┘
//!        │   watch: CallSnapshot        │                                │
//!        └──────────────────────────────┘◀──── SpeechEvent ──────────────┘
//!            broadcast: VoiceSessionEvent
//! ```
//!
//! The task multiplexes the command channel with the controller's next timer
//! deadline, so call state is only ever touched from one place.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use front_desk_config::{CallConfig, Settings, SpeechConfig};
use front_desk_core::{
    Error, SpeechCapture, SpeechEvent, SpeechSynthesis, Transcript, TranscriptEntry, TurnPhase,
};

use crate::controller::CallController;
use crate::intent::Intent;
use crate::AgentError;

/// Voice session configuration
#[derive(Debug, Clone, Default)]
pub struct VoiceSessionConfig {
    /// Greeting and hang-up timing, channel sizes
    pub call: CallConfig,
    /// Capture and voice parameters
    pub speech: SpeechConfig,
}

impl VoiceSessionConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            call: settings.call.clone(),
            speech: settings.speech.clone(),
        }
    }
}

/// Why a call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Hung up from the UI or API
    Caller,
    /// Grace delay after the farewell line elapsed
    Farewell,
    /// Collaborators went away
    Disconnected,
    /// The session driver stopped
    Shutdown,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Caller => "caller",
            EndReason::Farewell => "farewell",
            EndReason::Disconnected => "disconnected",
            EndReason::Shutdown => "shutdown",
        }
    }
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Voice session events
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VoiceSessionEvent {
    /// Call connected
    CallStarted { call_id: String },
    /// Turn phase changed
    PhaseChanged { old: TurnPhase, new: TurnPhase },
    /// Transcript entry appended
    Transcript(TranscriptEntry),
    /// Caller utterance classified
    IntentClassified { intent: Intent },
    /// Capture ended on its own and was started again
    CaptureRestarted,
    /// Call torn down
    CallEnded { reason: EndReason },
}

/// What a UI needs to render the call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallSnapshot {
    pub call_id: Option<String>,
    pub is_call_active: bool,
    pub is_listening: bool,
    pub is_speaking: bool,
    pub phase: TurnPhase,
    pub transcript: Transcript,
}

enum Command {
    StartCall {
        reply: oneshot::Sender<front_desk_core::Result<String>>,
    },
    EndCall {
        reason: EndReason,
        reply: oneshot::Sender<bool>,
    },
    Speech(SpeechEvent),
    Shutdown,
}

/// Spawns the session task
pub struct VoiceSession;

impl VoiceSession {
    /// Spawn a session driving `capture` and `synthesis`
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<C, S>(config: VoiceSessionConfig, capture: C, synthesis: S) -> VoiceSessionHandle
    where
        C: SpeechCapture,
        S: SpeechSynthesis,
    {
        let controller = CallController::new(&config, Box::new(capture), Box::new(synthesis));
        Self::spawn_controller(config, controller)
    }

    /// Spawn a session around an already built controller
    pub fn spawn_controller(
        config: VoiceSessionConfig,
        controller: CallController,
    ) -> VoiceSessionHandle {
        let buffer = config.call.event_buffer.max(1);
        let (command_tx, command_rx) = mpsc::channel(buffer);
        let (event_tx, _) = broadcast::channel(buffer);
        let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());

        let task = tokio::spawn(run(controller, command_rx, event_tx.clone(), snapshot_tx));

        VoiceSessionHandle {
            command_tx,
            event_tx,
            snapshot_rx,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }
}

/// Cloneable handle to a running voice session
#[derive(Clone)]
pub struct VoiceSessionHandle {
    command_tx: mpsc::Sender<Command>,
    event_tx: broadcast::Sender<VoiceSessionEvent>,
    snapshot_rx: watch::Receiver<CallSnapshot>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl VoiceSessionHandle {
    /// Start a call, returning its id
    ///
    /// Fails with `InvalidTransition` while a call is already active.
    pub async fn start_call(&self) -> Result<String, AgentError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::StartCall { reply }).await?;
        let call_id = rx.await.map_err(|_| Error::ChannelClosed)??;
        Ok(call_id)
    }

    /// End the call in progress. Returns false when there was none.
    pub async fn end_call(&self) -> Result<bool, AgentError> {
        self.end_call_with(EndReason::Caller).await
    }

    pub async fn end_call_with(&self, reason: EndReason) -> Result<bool, AgentError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::EndCall { reason, reply }).await?;
        Ok(rx.await.map_err(|_| Error::ChannelClosed)?)
    }

    /// Deliver an event from a speech collaborator
    pub async fn speech_event(&self, event: SpeechEvent) -> Result<(), AgentError> {
        self.send(Command::Speech(event)).await
    }

    /// Latest published state
    pub fn snapshot(&self) -> CallSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn watch(&self) -> watch::Receiver<CallSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<VoiceSessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }

    /// End any call and stop the session task
    pub async fn shutdown(&self) -> Result<(), AgentError> {
        // the task may already be gone
        let _ = self.command_tx.send(Command::Shutdown).await;

        let task = self.task.lock().take();
        if let Some(task) = task {
            task.await
                .map_err(|e| AgentError::Session(e.to_string()))?;
        }
        Ok(())
    }

    async fn send(&self, command: Command) -> Result<(), AgentError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| AgentError::Core(Error::ChannelClosed))
    }
}

impl std::fmt::Debug for VoiceSessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceSessionHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn run(
    mut controller: CallController,
    mut commands: mpsc::Receiver<Command>,
    events: broadcast::Sender<VoiceSessionEvent>,
    snapshots: watch::Sender<CallSnapshot>,
) {
    tracing::debug!("Voice session started");

    loop {
        let deadline = controller.next_deadline();

        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::StartCall { reply }) => {
                    let result = controller.start(Instant::now());
                    publish(&mut controller, &events, &snapshots);
                    let _ = reply.send(result);
                }
                Some(Command::EndCall { reason, reply }) => {
                    let ended = controller.end(reason);
                    publish(&mut controller, &events, &snapshots);
                    let _ = reply.send(ended);
                }
                Some(Command::Speech(event)) => {
                    controller.handle_speech_event(event, Instant::now());
                    publish(&mut controller, &events, &snapshots);
                }
                Some(Command::Shutdown) | None => {
                    controller.end(EndReason::Shutdown);
                    publish(&mut controller, &events, &snapshots);
                    break;
                }
            },
            _ = wait_until(deadline) => {
                controller.fire_due_timers(Instant::now());
                publish(&mut controller, &events, &snapshots);
            }
        }
    }

    tracing::debug!("Voice session stopped");
}

/// Push pending events and the new snapshot to observers
fn publish(
    controller: &mut CallController,
    events: &broadcast::Sender<VoiceSessionEvent>,
    snapshots: &watch::Sender<CallSnapshot>,
) {
    for event in controller.drain_events() {
        // no subscribers is fine
        let _ = events.send(event);
    }

    let snapshot = controller.snapshot();
    snapshots.send_if_modified(|current| {
        if *current == snapshot {
            return false;
        }
        *current = snapshot;
        true
    });
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CallLog, RecordingCapture, RecordingSynthesis};

    fn spawn(log: &CallLog) -> VoiceSessionHandle {
        VoiceSession::spawn(
            VoiceSessionConfig::default(),
            RecordingCapture::new(log.clone()),
            RecordingSynthesis::new(log.clone()),
        )
    }

    #[test]
    fn test_config_defaults() {
        let config = VoiceSessionConfig::default();
        assert_eq!(config.call.greeting_delay_ms, 500);
        assert_eq!(config.call.hangup_grace_ms, 2000);
        assert_eq!(config.speech.voice().rate, 0.9);
    }

    #[test]
    fn test_end_reason_names() {
        assert_eq!(EndReason::Farewell.to_string(), "farewell");
        assert_eq!(
            serde_json::to_string(&EndReason::Caller).unwrap(),
            r#""caller""#
        );
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(VoiceSessionEvent::PhaseChanged {
            old: TurnPhase::Listening,
            new: TurnPhase::Processing,
        })
        .unwrap();
        assert_eq!(json["event"], "phase_changed");
        assert_eq!(json["new"], "processing");
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_end_call() {
        let log = CallLog::new();
        let handle = spawn(&log);
        assert!(!handle.snapshot().is_call_active);

        let call_id = handle.start_call().await.unwrap();
        let snapshot = handle.snapshot();
        assert!(snapshot.is_call_active);
        assert_eq!(snapshot.call_id.as_deref(), Some(call_id.as_str()));

        let err = handle.start_call().await.unwrap_err();
        assert!(err.is_invalid_transition());

        assert!(handle.end_call().await.unwrap());
        assert!(!handle.end_call().await.unwrap());
        assert!(!handle.snapshot().is_call_active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_session() {
        let log = CallLog::new();
        let handle = spawn(&log);
        handle.start_call().await.unwrap();

        handle.shutdown().await.unwrap();
        assert!(handle.is_closed());
        assert!(!handle.snapshot().is_call_active);

        let err = handle.start_call().await.unwrap_err();
        assert!(err.is_closed());
    }
}
