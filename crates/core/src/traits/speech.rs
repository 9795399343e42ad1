//! Speech collaborator traits
//!
//! The front desk never touches audio. Recognition and synthesis are done by
//! external services (a browser's speech APIs, a telephony bridge, ...) that
//! the controller drives through these two traits. Both are command-only:
//! results come back later as [`SpeechEvent`]s fed into the controller.

use serde::{Deserialize, Serialize};

use crate::{Result, VoiceConfig};

/// Speech-to-text collaborator
///
/// # Example
///
/// ```ignore
/// let mut capture: Box<dyn SpeechCapture> = Box::new(BrowserCapture::new(tx));
/// capture.start()?;
/// // ... SpeechEvent::Utterance arrives through the event channel
/// capture.stop();
/// ```
pub trait SpeechCapture: Send + 'static {
    /// Begin continuous, final-only capture
    ///
    /// Returns [`crate::Error::CaptureStart`] when capture is already running
    /// or the provider refuses to start (e.g. microphone permission denied).
    fn start(&mut self) -> Result<()>;

    /// Stop capture. The provider still reports [`SpeechEvent::CaptureEnded`].
    fn stop(&mut self);

    /// Name for logging
    fn name(&self) -> &str {
        "capture"
    }
}

/// Text-to-speech collaborator
pub trait SpeechSynthesis: Send + 'static {
    /// Queue `text` for playback
    ///
    /// Returns [`crate::Error::SynthesisUnavailable`] when there is no voice
    /// output at all. Playback start and end are reported as
    /// [`SpeechEvent::SpeechStarted`] and [`SpeechEvent::SpeechEnded`].
    fn speak(&mut self, text: &str, voice: &VoiceConfig) -> Result<()>;

    /// Drop the utterance being spoken and everything queued behind it
    fn cancel(&mut self);

    /// Name for logging
    fn name(&self) -> &str {
        "synthesis"
    }
}

/// Events reported by the speech collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpeechEvent {
    /// A finalized phrase of caller speech
    Utterance { text: String },
    /// Recognition failed. Capture is expected to end shortly afterwards.
    CaptureError { reason: String },
    /// Capture could not be started by the provider
    CaptureStartFailed { reason: String },
    /// Capture stopped, either on request or by provider timeout
    CaptureEnded,
    /// Playback of an utterance began
    SpeechStarted,
    /// Playback of an utterance finished or was cancelled
    SpeechEnded,
}

impl SpeechEvent {
    pub fn utterance(text: impl Into<String>) -> Self {
        SpeechEvent::Utterance { text: text.into() }
    }

    /// Event name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            SpeechEvent::Utterance { .. } => "utterance",
            SpeechEvent::CaptureError { .. } => "capture_error",
            SpeechEvent::CaptureStartFailed { .. } => "capture_start_failed",
            SpeechEvent::CaptureEnded => "capture_ended",
            SpeechEvent::SpeechStarted => "speech_started",
            SpeechEvent::SpeechEnded => "speech_ended",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event: SpeechEvent =
            serde_json::from_str(r#"{"type":"utterance","text":"hello"}"#).unwrap();
        assert_eq!(event, SpeechEvent::utterance("hello"));

        let json = serde_json::to_string(&SpeechEvent::CaptureEnded).unwrap();
        assert_eq!(json, r#"{"type":"capture_ended"}"#);
    }

    #[test]
    fn test_event_kind() {
        assert_eq!(SpeechEvent::SpeechEnded.kind(), "speech_ended");
        assert_eq!(
            SpeechEvent::CaptureError { reason: "network".into() }.kind(),
            "capture_error"
        );
    }
}
