//! Turn taking
//!
//! ```text
//!            greeting                utterance
//!   Idle ─────────────▶ Speaking ◀──────────── Processing
//!                          │                       ▲
//!                          │ speech ended          │ utterance
//!                          ▼                       │
//!                      Listening ──────────────────┘
//! ```
//!
//! Capture is always stopped before `speak` is issued and only restarted once
//! speech has ended, so the agent never transcribes its own voice.
//!
//! Speech events carry no utterance identity. The controller counts the
//! utterances it has handed to the synthesizer and the ones it cancelled, and
//! a speech-ended report is matched against cancelled utterances first.

use front_desk_core::{
    Error, SpeechCapture, SpeechSynthesis, Speaker, Transcript, TurnPhase, VoiceConfig,
};

use crate::intent::{Classification, IntentClassifier};
use crate::response::{respond, Reply};
use crate::voice_session::VoiceSessionEvent;

/// What the owner of the turn controller has to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnSignal {
    /// Nothing, the turn controller handled it
    Continue,
    /// The farewell line is done, schedule the hang-up
    HangupDue,
}

/// Outcome of one handled utterance
#[derive(Debug, Clone)]
pub struct TurnResult {
    pub classification: Classification,
    pub reply: Reply,
    pub signal: TurnSignal,
}

/// Drives the speech collaborators through listen / respond cycles
pub struct TurnController {
    classifier: IntentClassifier,
    capture: Box<dyn SpeechCapture>,
    synthesis: Box<dyn SpeechSynthesis>,
    voice: VoiceConfig,
    phase: TurnPhase,
    is_listening: bool,
    is_speaking: bool,
    hangup_pending: bool,
    /// Utterances passed to `speak` whose end has not been reported
    speech_in_flight: u32,
    /// Cancelled utterances whose end report is still due
    cancelled_speech: u32,
    transcript: Transcript,
    events: Vec<VoiceSessionEvent>,
}

impl TurnController {
    pub fn new(
        capture: Box<dyn SpeechCapture>,
        synthesis: Box<dyn SpeechSynthesis>,
        voice: VoiceConfig,
    ) -> Self {
        Self {
            classifier: IntentClassifier::default(),
            capture,
            synthesis,
            voice,
            phase: TurnPhase::Idle,
            is_listening: false,
            is_speaking: false,
            hangup_pending: false,
            speech_in_flight: 0,
            cancelled_speech: 0,
            transcript: Transcript::new(),
            events: Vec::new(),
        }
    }

    /// Replace the intent classifier
    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_listening(&self) -> bool {
        self.is_listening
    }

    pub fn is_speaking(&self) -> bool {
        self.is_speaking
    }

    /// A farewell was spoken and the call ends once speech finishes
    pub fn hangup_pending(&self) -> bool {
        self.hangup_pending
    }

    /// Speech was issued and its end has not been reported yet
    pub fn awaiting_speech_end(&self) -> bool {
        self.speech_in_flight > 0
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn clear_transcript(&mut self) {
        self.transcript.clear();
    }

    /// Take the events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<VoiceSessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: VoiceSessionEvent) {
        self.events.push(event);
    }

    /// Begin listening
    pub fn arm(&mut self) {
        self.set_phase(TurnPhase::Listening);
        self.start_capture();
    }

    /// Speak the opening line. Capture is armed once it finishes.
    pub fn speak_opening(&mut self, text: &str) -> TurnSignal {
        self.speak(text)
    }

    /// Handle a finalized utterance
    ///
    /// Utterances that arrive while not listening are late results from a
    /// capture that has already been stopped and are dropped.
    pub fn handle_utterance(&mut self, text: &str) -> Option<TurnResult> {
        if self.phase != TurnPhase::Listening {
            tracing::debug!(phase = %self.phase, "Dropping utterance received outside listening");
            return None;
        }
        if text.trim().is_empty() {
            tracing::debug!("Dropping blank utterance");
            return None;
        }

        self.set_phase(TurnPhase::Processing);
        self.record(Speaker::Caller, text);
        self.stop_capture();

        let classification = self.classifier.classify_detailed(text);
        self.emit(VoiceSessionEvent::IntentClassified {
            intent: classification.intent,
        });

        let reply = respond(classification.intent);
        if reply.ends_call() {
            self.hangup_pending = true;
        }

        tracing::info!(
            intent = %classification.intent,
            hangup = reply.ends_call(),
            "Replying to caller"
        );

        let signal = self.speak(reply.text);
        Some(TurnResult {
            classification,
            reply,
            signal,
        })
    }

    /// Playback began. Only counts while a reply of ours is in flight.
    pub fn on_speech_started(&mut self) {
        if self.phase != TurnPhase::Speaking || self.speech_in_flight == 0 {
            tracing::debug!(phase = %self.phase, "Ignoring speech start, nothing in flight");
            return;
        }
        self.is_speaking = true;
    }

    /// Speech finished: resume listening, or hand the hang-up back to the caller
    ///
    /// The end of a cancelled utterance is swallowed so it cannot be taken
    /// for the end of the one playing now.
    pub fn on_speech_ended(&mut self) -> TurnSignal {
        if self.cancelled_speech > 0 {
            self.cancelled_speech -= 1;
            tracing::debug!(
                remaining = self.cancelled_speech,
                "Ignoring speech end of cancelled utterance"
            );
            return TurnSignal::Continue;
        }
        if self.speech_in_flight == 0 {
            tracing::debug!(phase = %self.phase, "Ignoring speech end, nothing in flight");
            return TurnSignal::Continue;
        }

        self.speech_in_flight -= 1;
        self.is_speaking = false;
        if self.phase != TurnPhase::Speaking || self.speech_in_flight > 0 {
            return TurnSignal::Continue;
        }
        self.finish_speaking()
    }

    /// No speech end arrived in time
    ///
    /// Playback is cancelled so capture can resume without hearing it, and
    /// the turn finishes as if speech had ended. The provider dropped at least
    /// one report, so both counts start over.
    pub fn on_speech_timeout(&mut self) -> TurnSignal {
        if self.speech_in_flight == 0 {
            return TurnSignal::Continue;
        }

        tracing::warn!(
            synthesis = self.synthesis.name(),
            in_flight = self.speech_in_flight,
            cancelled = self.cancelled_speech,
            "No speech end reported, cancelling playback"
        );
        self.synthesis.cancel();
        self.speech_in_flight = 0;
        self.cancelled_speech = 0;
        self.is_speaking = false;
        if self.phase != TurnPhase::Speaking {
            return TurnSignal::Continue;
        }
        self.finish_speaking()
    }

    /// Capture stopped. Restarted when the controller still expects to listen.
    ///
    /// Returns true if capture was restarted.
    pub fn on_capture_ended(&mut self) -> bool {
        self.is_listening = false;
        if self.phase != TurnPhase::Listening {
            return false;
        }

        tracing::debug!(capture = self.capture.name(), "Capture ended while listening, restarting");
        let restarted = self.start_capture();
        if restarted {
            self.emit(VoiceSessionEvent::CaptureRestarted);
        }
        restarted
    }

    /// Recognition failed. Capture restarts on its own end event.
    pub fn on_capture_error(&mut self, reason: &str) {
        let err = Error::Capture(reason.to_string());
        self.log_collaborator_error(&err, "Recognition error, waiting for capture to end");
    }

    pub fn on_capture_start_failed(&mut self, reason: &str) {
        let err = Error::CaptureStart(reason.to_string());
        self.log_collaborator_error(&err, "Capture failed to start");
        self.is_listening = false;
    }

    /// Stop capture and cancel speech, then disarm
    pub fn reset(&mut self) {
        self.capture.stop();
        self.cancel_speech();
        self.is_listening = false;
        self.hangup_pending = false;
        self.set_phase(TurnPhase::Idle);
    }

    fn speak(&mut self, text: &str) -> TurnSignal {
        if self.is_listening {
            self.stop_capture();
        }
        self.set_phase(TurnPhase::Speaking);
        self.record(Speaker::Agent, text);

        match self.synthesis.speak(text, &self.voice) {
            Ok(()) => {
                self.speech_in_flight += 1;
                TurnSignal::Continue
            }
            Err(e) => {
                self.log_collaborator_error(&e, "Reply not spoken");
                self.finish_speaking()
            }
        }
    }

    /// Cancel playback. Whatever was in flight still reports its end.
    fn cancel_speech(&mut self) {
        self.synthesis.cancel();
        self.cancelled_speech += self.speech_in_flight;
        self.speech_in_flight = 0;
        self.is_speaking = false;
    }

    fn finish_speaking(&mut self) -> TurnSignal {
        self.is_speaking = false;
        if self.hangup_pending {
            return TurnSignal::HangupDue;
        }
        self.arm();
        TurnSignal::Continue
    }

    fn start_capture(&mut self) -> bool {
        match self.capture.start() {
            Ok(()) => {
                self.is_listening = true;
                true
            }
            Err(e) => {
                self.log_collaborator_error(&e, "Capture failed to start");
                self.is_listening = false;
                false
            }
        }
    }

    fn log_collaborator_error(&self, err: &Error, message: &str) {
        if err.is_recoverable() {
            tracing::warn!(
                capture = self.capture.name(),
                synthesis = self.synthesis.name(),
                error = %err,
                "{}",
                message
            );
        } else {
            tracing::error!(
                capture = self.capture.name(),
                synthesis = self.synthesis.name(),
                error = %err,
                "{}",
                message
            );
        }
    }

    fn stop_capture(&mut self) {
        self.capture.stop();
        self.is_listening = false;
    }

    fn record(&mut self, speaker: Speaker, text: &str) {
        let entry = self.transcript.push(speaker, text).clone();
        self.emit(VoiceSessionEvent::Transcript(entry));
    }

    fn set_phase(&mut self, new: TurnPhase) {
        let old = self.phase;
        if old == new {
            return;
        }
        self.phase = new;
        tracing::debug!(old = %old, new = %new, "Turn phase changed");
        self.emit(VoiceSessionEvent::PhaseChanged { old, new });
    }
}

impl std::fmt::Debug for TurnController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnController")
            .field("capture", &self.capture.name())
            .field("synthesis", &self.synthesis.name())
            .field("phase", &self.phase)
            .field("is_listening", &self.is_listening)
            .field("is_speaking", &self.is_speaking)
            .field("hangup_pending", &self.hangup_pending)
            .field("speech_in_flight", &self.speech_in_flight)
            .field("cancelled_speech", &self.cancelled_speech)
            .field("transcript_len", &self.transcript.len())
            .finish()
    }
}
