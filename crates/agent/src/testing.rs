//! Recording speech collaborators
//!
//! Stand-ins for real capture and synthesis providers. Every command the
//! controller issues is appended to a shared [`CallLog`] so tests can check
//! ordering across both collaborators.

use std::sync::Arc;

use parking_lot::Mutex;

use front_desk_core::{Error, Result, SpeechCapture, SpeechSynthesis, VoiceConfig};

/// Command issued to a collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorCall {
    StartCapture,
    StopCapture,
    Speak(String),
    CancelSpeech,
}

/// Shared, ordered log of collaborator commands
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<CollaboratorCall>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: CollaboratorCall) {
        self.0.lock().push(call);
    }

    pub fn calls(&self) -> Vec<CollaboratorCall> {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }

    /// Texts passed to `speak`, in order
    pub fn spoken(&self) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter_map(|call| match call {
                CollaboratorCall::Speak(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &CollaboratorCall) -> usize {
        self.0.lock().iter().filter(|c| *c == call).count()
    }

    /// True when no `speak` was issued while capture was running
    pub fn speech_never_overlaps_capture(&self) -> bool {
        let mut capturing = false;
        for call in self.0.lock().iter() {
            match call {
                CollaboratorCall::StartCapture => capturing = true,
                CollaboratorCall::StopCapture => capturing = false,
                CollaboratorCall::Speak(_) if capturing => return false,
                _ => {}
            }
        }
        true
    }
}

/// Capture provider that records start/stop
#[derive(Debug, Clone)]
pub struct RecordingCapture {
    log: CallLog,
    refuse: Option<String>,
}

impl RecordingCapture {
    pub fn new(log: CallLog) -> Self {
        Self { log, refuse: None }
    }

    /// A provider whose `start` always fails, e.g. microphone permission denied
    pub fn refusing(log: CallLog, reason: impl Into<String>) -> Self {
        Self {
            log,
            refuse: Some(reason.into()),
        }
    }
}

impl SpeechCapture for RecordingCapture {
    fn start(&mut self) -> Result<()> {
        if let Some(reason) = &self.refuse {
            return Err(Error::CaptureStart(reason.clone()));
        }
        self.log.record(CollaboratorCall::StartCapture);
        Ok(())
    }

    fn stop(&mut self) {
        self.log.record(CollaboratorCall::StopCapture);
    }

    fn name(&self) -> &str {
        "recording-capture"
    }
}

/// Synthesizer that records speak/cancel
#[derive(Debug, Clone)]
pub struct RecordingSynthesis {
    log: CallLog,
    available: bool,
}

impl RecordingSynthesis {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            available: true,
        }
    }

    /// A synthesizer that is missing entirely
    pub fn unavailable(log: CallLog) -> Self {
        Self {
            log,
            available: false,
        }
    }
}

impl SpeechSynthesis for RecordingSynthesis {
    fn speak(&mut self, text: &str, _voice: &VoiceConfig) -> Result<()> {
        if !self.available {
            return Err(Error::SynthesisUnavailable);
        }
        self.log.record(CollaboratorCall::Speak(text.to_string()));
        Ok(())
    }

    fn cancel(&mut self) {
        self.log.record(CollaboratorCall::CancelSpeech);
    }

    fn name(&self) -> &str {
        "recording-synthesis"
    }
}
