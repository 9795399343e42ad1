//! WebSocket Handler
//!
//! The browser does the actual recognition and synthesis. It receives
//! collaborator commands (`start_capture`, `speak`, ...) and reports speech
//! events back, plus a `state` message whenever the call snapshot changes.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::WatchStream;

use front_desk_agent::{CallSnapshot, VoiceSessionHandle};
use front_desk_core::{
    CaptureConfig, Error, Result, SpeechCapture, SpeechEvent, SpeechSynthesis, VoiceConfig,
};

use crate::state::{AppState, AttachedClient};
use crate::ServerError;

/// Messages from the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    StartCall,
    EndCall,
    Utterance { text: String },
    CaptureEnded,
    CaptureError { reason: String },
    CaptureStartFailed { reason: String },
    SpeechStarted,
    SpeechEnded,
    Ping,
}

impl ClientMessage {
    /// Parse one text frame
    pub fn parse(text: &str) -> std::result::Result<Self, ServerError> {
        serde_json::from_str(text)
            .map_err(|e| ServerError::InvalidRequest(format!("Invalid message: {}", e)))
    }

    /// The speech event carried by this message, if any
    pub fn into_speech_event(self) -> Option<SpeechEvent> {
        match self {
            ClientMessage::Utterance { text } => Some(SpeechEvent::Utterance { text }),
            ClientMessage::CaptureEnded => Some(SpeechEvent::CaptureEnded),
            ClientMessage::CaptureError { reason } => Some(SpeechEvent::CaptureError { reason }),
            ClientMessage::CaptureStartFailed { reason } => {
                Some(SpeechEvent::CaptureStartFailed { reason })
            }
            ClientMessage::SpeechStarted => Some(SpeechEvent::SpeechStarted),
            ClientMessage::SpeechEnded => Some(SpeechEvent::SpeechEnded),
            ClientMessage::StartCall | ClientMessage::EndCall | ClientMessage::Ping => None,
        }
    }
}

/// Messages to the browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    StartCapture {
        locale: String,
        continuous: bool,
        interim_results: bool,
    },
    StopCapture,
    Speak {
        text: String,
        locale: String,
        rate: f32,
        pitch: f32,
    },
    CancelSpeech,
    State {
        snapshot: CallSnapshot,
    },
    Error {
        message: String,
    },
    Pong,
}

/// Speech capture performed by the browser
#[derive(Debug, Clone)]
pub struct WsCapture {
    outbound: mpsc::UnboundedSender<ServerMessage>,
    config: CaptureConfig,
}

impl WsCapture {
    pub fn new(outbound: mpsc::UnboundedSender<ServerMessage>, config: CaptureConfig) -> Self {
        Self { outbound, config }
    }
}

impl SpeechCapture for WsCapture {
    fn start(&mut self) -> Result<()> {
        self.outbound
            .send(ServerMessage::StartCapture {
                locale: self.config.locale.clone(),
                continuous: self.config.continuous,
                interim_results: self.config.interim_results,
            })
            .map_err(|_| Error::CaptureStart("client disconnected".to_string()))
    }

    fn stop(&mut self) {
        let _ = self.outbound.send(ServerMessage::StopCapture);
    }

    fn name(&self) -> &str {
        "browser-capture"
    }
}

/// Speech synthesis performed by the browser
#[derive(Debug, Clone)]
pub struct WsSynthesis {
    outbound: mpsc::UnboundedSender<ServerMessage>,
}

impl WsSynthesis {
    pub fn new(outbound: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self { outbound }
    }
}

impl SpeechSynthesis for WsSynthesis {
    fn speak(&mut self, text: &str, voice: &VoiceConfig) -> Result<()> {
        self.outbound
            .send(ServerMessage::Speak {
                text: text.to_string(),
                locale: voice.locale.clone(),
                rate: voice.rate,
                pitch: voice.pitch,
            })
            .map_err(|_| Error::SynthesisUnavailable)
    }

    fn cancel(&mut self) {
        let _ = self.outbound.send(ServerMessage::CancelSpeech);
    }

    fn name(&self) -> &str {
        "browser-synthesis"
    }
}

/// WebSocket upgrade handler
///
/// GET /ws
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> std::result::Result<Response, ServerError> {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let client = state.attach(outbound_tx.clone())?;

    let release = state.clone();
    let client_id = client.id;

    Ok(ws
        .on_failed_upgrade(move |e: axum::Error| {
            let err = ServerError::WebSocket(e.to_string());
            tracing::warn!(client_id, error = %err, "WebSocket upgrade failed");
            tokio::spawn(async move { release.detach(client_id).await });
        })
        .on_upgrade(move |socket| handle_socket(socket, state, client, outbound_tx, outbound_rx)))
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    client: AttachedClient,
    outbound_tx: mpsc::UnboundedSender<ServerMessage>,
    outbound_rx: mpsc::UnboundedReceiver<ServerMessage>,
) {
    let (sink, mut stream) = socket.split();
    let writer = tokio::spawn(write_messages(sink, outbound_rx, client.session.clone()));

    tracing::info!(client_id = client.id, "WebSocket connected");

    while let Some(message) = stream.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                let err = ServerError::WebSocket(e.to_string());
                tracing::debug!(client_id = client.id, error = %err, "WebSocket receive failed");
                break;
            }
        };

        let result = match ClientMessage::parse(&text) {
            Ok(message) => dispatch(message, &client.session, &outbound_tx).await,
            Err(e) => {
                tracing::debug!(client_id = client.id, error = %e, "Unparseable client message");
                Err(e)
            }
        };
        if let Err(e) = result {
            let _ = outbound_tx.send(ServerMessage::Error {
                message: e.to_string(),
            });
        }
    }

    state.detach(client.id).await;
    writer.abort();
    tracing::info!(client_id = client.id, "WebSocket disconnected");
}

/// Route one client message to the session
async fn dispatch(
    message: ClientMessage,
    session: &VoiceSessionHandle,
    outbound: &mpsc::UnboundedSender<ServerMessage>,
) -> std::result::Result<(), ServerError> {
    match message {
        ClientMessage::StartCall => {
            session.start_call().await?;
        }
        ClientMessage::EndCall => {
            session.end_call().await?;
        }
        ClientMessage::Ping => {
            let _ = outbound.send(ServerMessage::Pong);
        }
        other => {
            if let Some(event) = other.into_speech_event() {
                session.speech_event(event).await?;
            }
        }
    }
    Ok(())
}

/// Forward collaborator commands and snapshot changes to the socket
async fn write_messages<S>(
    mut sink: S,
    mut outbound: mpsc::UnboundedReceiver<ServerMessage>,
    session: VoiceSessionHandle,
) where
    S: futures::Sink<Message> + Unpin,
{
    let mut snapshots = WatchStream::new(session.watch());

    loop {
        let message = tokio::select! {
            Some(message) = outbound.recv() => message,
            Some(snapshot) = snapshots.next() => ServerMessage::State { snapshot },
            else => break,
        };

        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize server message");
                continue;
            }
        };

        if sink.send(Message::Text(json)).await.is_err() {
            break;
        }
    }
}
