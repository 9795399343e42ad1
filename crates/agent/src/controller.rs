//! Call controller
//!
//! Owns the call slot, the turn controller and three timers: the opening
//! greeting, the speech watchdog and the farewell hang-up. Every input is a
//! `&mut self` method that runs to completion; the caller supplies `now` so
//! timers are testable without a runtime.

use tokio::time::Instant;

use front_desk_config::CallConfig;
use front_desk_core::{
    CallState, Result, SpeechCapture, SpeechEvent, SpeechSynthesis, Transcript, TurnPhase,
};

use crate::call::CallSession;
use crate::intent::IntentClassifier;
use crate::response::OPENING_GREETING;
use crate::turn::{TurnController, TurnResult, TurnSignal};
use crate::voice_session::{CallSnapshot, EndReason, VoiceSessionConfig, VoiceSessionEvent};

pub struct CallController {
    call: CallConfig,
    session: CallSession,
    turn: TurnController,
    greeting_due: Option<Instant>,
    speech_due: Option<Instant>,
    hangup_due: Option<Instant>,
}

impl CallController {
    pub fn new(
        config: &VoiceSessionConfig,
        capture: Box<dyn SpeechCapture>,
        synthesis: Box<dyn SpeechSynthesis>,
    ) -> Self {
        Self {
            call: config.call.clone(),
            session: CallSession::new(),
            turn: TurnController::new(capture, synthesis, config.speech.voice()),
            greeting_due: None,
            speech_due: None,
            hangup_due: None,
        }
    }

    /// Replace the intent classifier
    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.turn = self.turn.with_classifier(classifier);
        self
    }

    pub fn state(&self) -> CallState {
        self.session.state()
    }

    pub fn is_call_active(&self) -> bool {
        self.session.is_active()
    }

    pub fn call_id(&self) -> Option<&str> {
        self.session.id()
    }

    pub fn phase(&self) -> TurnPhase {
        self.turn.phase()
    }

    pub fn is_listening(&self) -> bool {
        self.turn.is_listening()
    }

    pub fn is_speaking(&self) -> bool {
        self.turn.is_speaking()
    }

    pub fn transcript(&self) -> &Transcript {
        self.turn.transcript()
    }

    /// Start a call. The greeting is spoken once the greeting delay has passed.
    pub fn start(&mut self, now: Instant) -> Result<String> {
        if let Err(e) = self.session.start() {
            tracing::warn!(state = %self.session.state(), "Call start rejected");
            return Err(e);
        }

        self.turn.clear_transcript();
        self.greeting_due = Some(now + self.call.greeting_delay());
        self.speech_due = None;
        self.hangup_due = None;

        let call_id = self.session.id().unwrap_or_default().to_string();
        tracing::info!(call_id = %call_id, "Call started");
        self.turn.emit(VoiceSessionEvent::CallStarted {
            call_id: call_id.clone(),
        });
        Ok(call_id)
    }

    /// End the call in progress
    ///
    /// Capture and speech are stopped before the state changes. Returns false
    /// (and does nothing) when no call is active.
    pub fn end(&mut self, reason: EndReason) -> bool {
        if !self.session.is_active() {
            tracing::debug!(reason = %reason, "No active call to end");
            return false;
        }

        self.turn.reset();
        self.greeting_due = None;
        self.speech_due = None;
        self.hangup_due = None;

        if let Some(record) = self.session.terminate() {
            tracing::info!(
                call_id = %record.id,
                reason = %reason,
                duration_ms = record.duration().num_milliseconds(),
                transcript_len = self.turn.transcript().len(),
                "Call ended"
            );
        }
        self.turn.emit(VoiceSessionEvent::CallEnded { reason });
        true
    }

    /// Feed an event from the speech collaborators
    pub fn handle_speech_event(&mut self, event: SpeechEvent, now: Instant) {
        if !self.session.is_active() {
            if event == SpeechEvent::SpeechEnded {
                // settles the count of cancelled utterances
                self.turn.on_speech_ended();
            }
            tracing::debug!(event = event.kind(), "Ignoring speech event, no active call");
            return;
        }

        let signal = match event {
            SpeechEvent::Utterance { text } => {
                self.handle_utterance(&text, now);
                return;
            }
            SpeechEvent::CaptureEnded => {
                self.turn.on_capture_ended();
                TurnSignal::Continue
            }
            SpeechEvent::CaptureError { reason } => {
                self.turn.on_capture_error(&reason);
                TurnSignal::Continue
            }
            SpeechEvent::CaptureStartFailed { reason } => {
                self.turn.on_capture_start_failed(&reason);
                TurnSignal::Continue
            }
            SpeechEvent::SpeechStarted => {
                self.turn.on_speech_started();
                TurnSignal::Continue
            }
            SpeechEvent::SpeechEnded => self.turn.on_speech_ended(),
        };
        self.apply(signal, now);
        self.watch_speech(now);
    }

    /// Handle a finalized utterance
    pub fn handle_utterance(&mut self, text: &str, now: Instant) -> Option<TurnResult> {
        if !self.session.is_active() {
            tracing::debug!("Ignoring utterance, no active call");
            return None;
        }
        let result = self.turn.handle_utterance(text)?;
        self.apply(result.signal, now);
        self.watch_speech(now);
        Some(result)
    }

    /// Earliest pending timer
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.greeting_due, self.speech_due, self.hangup_due]
            .into_iter()
            .flatten()
            .min()
    }

    /// Run the timers that are due at `now`
    pub fn fire_due_timers(&mut self, now: Instant) {
        if self.greeting_due.is_some_and(|due| due <= now) {
            self.greeting_due = None;
            tracing::debug!(call_id = ?self.session.id(), "Speaking opening greeting");
            let signal = self.turn.speak_opening(OPENING_GREETING);
            self.apply(signal, now);
        }

        if self.speech_due.is_some_and(|due| due <= now) {
            self.speech_due = None;
            let signal = self.turn.on_speech_timeout();
            self.apply(signal, now);
        }

        if self.hangup_due.is_some_and(|due| due <= now) {
            self.hangup_due = None;
            self.end(EndReason::Farewell);
        }

        self.watch_speech(now);
    }

    /// Current observable state
    pub fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            call_id: self.session.id().map(String::from),
            is_call_active: self.session.is_active(),
            is_listening: self.turn.is_listening(),
            is_speaking: self.turn.is_speaking(),
            phase: self.turn.phase(),
            transcript: self.turn.transcript().clone(),
        }
    }

    /// Take the events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<VoiceSessionEvent> {
        self.turn.drain_events()
    }

    fn apply(&mut self, signal: TurnSignal, now: Instant) {
        if signal == TurnSignal::HangupDue && self.hangup_due.is_none() {
            tracing::info!(
                call_id = ?self.session.id(),
                grace_ms = self.call.hangup_grace_ms,
                "Farewell spoken, hanging up after grace delay"
            );
            self.hangup_due = Some(now + self.call.hangup_grace());
        }
    }

    /// Arm the watchdog while speech is in flight, disarm once it has ended
    fn watch_speech(&mut self, now: Instant) {
        if !self.turn.awaiting_speech_end() {
            self.speech_due = None;
        } else if self.speech_due.is_none() {
            self.speech_due = Some(now + self.call.speech_timeout());
        }
    }
}

impl std::fmt::Debug for CallController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallController")
            .field("session", &self.session)
            .field("turn", &self.turn)
            .field("greeting_due", &self.greeting_due)
            .field("speech_due", &self.speech_due)
            .field("hangup_due", &self.hangup_due)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CallLog, CollaboratorCall, RecordingCapture, RecordingSynthesis};
    use front_desk_core::{Error, Speaker};
    use std::time::Duration;

    const GREETING_DELAY: Duration = Duration::from_millis(500);
    const GRACE: Duration = Duration::from_millis(2000);
    const SPEECH_TIMEOUT: Duration = Duration::from_secs(15);

    fn controller(log: &CallLog) -> CallController {
        CallController::new(
            &VoiceSessionConfig::default(),
            Box::new(RecordingCapture::new(log.clone())),
            Box::new(RecordingSynthesis::new(log.clone())),
        )
    }

    /// Start a call and get it to listening
    fn connected(log: &CallLog, t0: Instant) -> CallController {
        let mut controller = controller(log);
        controller.start(t0).unwrap();
        controller.fire_due_timers(t0 + GREETING_DELAY);
        controller.handle_speech_event(SpeechEvent::SpeechEnded, t0 + GREETING_DELAY);
        controller
    }

    #[test]
    fn test_start_schedules_greeting() {
        let log = CallLog::new();
        let mut controller = controller(&log);
        let t0 = Instant::now();

        controller.start(t0).unwrap();
        assert!(controller.is_call_active());
        assert_eq!(controller.next_deadline(), Some(t0 + GREETING_DELAY));

        // nothing before the delay
        controller.fire_due_timers(t0 + Duration::from_millis(499));
        assert!(log.calls().is_empty());

        controller.fire_due_timers(t0 + GREETING_DELAY);
        assert_eq!(log.spoken(), vec![OPENING_GREETING.to_string()]);
        assert_eq!(controller.phase(), TurnPhase::Speaking);
        assert!(!controller.is_listening());
        // only the speech watchdog is left
        assert_eq!(
            controller.next_deadline(),
            Some(t0 + GREETING_DELAY + SPEECH_TIMEOUT)
        );

        let entry = controller.transcript().last().unwrap();
        assert_eq!(entry.speaker, Speaker::Agent);
        assert_eq!(entry.text, OPENING_GREETING);
    }

    #[test]
    fn test_capture_armed_after_greeting() {
        let log = CallLog::new();
        let controller = connected(&log, Instant::now());
        assert_eq!(controller.phase(), TurnPhase::Listening);
        assert!(controller.is_listening());
        assert_eq!(
            log.calls(),
            vec![
                CollaboratorCall::Speak(OPENING_GREETING.to_string()),
                CollaboratorCall::StartCapture,
            ]
        );
    }

    #[test]
    fn test_start_while_active_fails() {
        let log = CallLog::new();
        let mut controller = controller(&log);
        let t0 = Instant::now();
        let id = controller.start(t0).unwrap();

        let err = controller.start(t0).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { from: CallState::Active, .. }));
        assert_eq!(controller.call_id(), Some(id.as_str()));
    }

    #[test]
    fn test_end_is_idempotent() {
        let log = CallLog::new();
        let t0 = Instant::now();
        let mut controller = connected(&log, t0);

        assert!(controller.end(EndReason::Caller));
        let once = controller.snapshot();
        let calls = log.calls();

        assert!(!controller.end(EndReason::Caller));
        assert_eq!(controller.snapshot(), once);
        assert_eq!(log.calls(), calls);

        assert_eq!(controller.state(), CallState::Idle);
        assert_eq!(controller.phase(), TurnPhase::Idle);
        assert!(!once.is_call_active);
        assert!(!once.is_listening);
        assert!(!once.is_speaking);
    }

    #[test]
    fn test_end_on_idle_controller() {
        let log = CallLog::new();
        let mut controller = controller(&log);
        assert!(!controller.end(EndReason::Caller));
        assert!(log.calls().is_empty());
        assert!(controller.drain_events().is_empty());
    }

    #[test]
    fn test_end_stops_collaborators_first() {
        let log = CallLog::new();
        let t0 = Instant::now();
        let mut controller = connected(&log, t0);
        controller.handle_utterance("hello", t0 + GREETING_DELAY);
        controller.handle_speech_event(SpeechEvent::SpeechStarted, t0 + GREETING_DELAY);

        log.clear();
        controller.drain_events();
        controller.end(EndReason::Caller);

        assert_eq!(
            log.calls(),
            vec![CollaboratorCall::StopCapture, CollaboratorCall::CancelSpeech]
        );
        let events = controller.drain_events();
        assert!(matches!(
            events.last(),
            Some(VoiceSessionEvent::CallEnded { reason: EndReason::Caller })
        ));
    }

    #[test]
    fn test_end_before_greeting_cancels_timer() {
        let log = CallLog::new();
        let mut controller = controller(&log);
        let t0 = Instant::now();
        controller.start(t0).unwrap();
        controller.end(EndReason::Caller);

        assert_eq!(controller.next_deadline(), None);
        controller.fire_due_timers(t0 + GREETING_DELAY);
        assert!(log.spoken().is_empty());
    }

    #[test]
    fn test_farewell_round_trip() {
        let log = CallLog::new();
        let t0 = Instant::now();
        let mut controller = connected(&log, t0);
        let t1 = t0 + Duration::from_secs(3);

        controller.handle_speech_event(SpeechEvent::utterance("thank you, bye"), t1);
        assert_eq!(
            log.spoken().last().map(String::as_str),
            Some("Thank you for calling Style and Shine Barber Shop! Have a great day!")
        );
        // hang-up waits for speech to finish
        assert_eq!(controller.next_deadline(), Some(t1 + SPEECH_TIMEOUT));
        assert!(controller.is_call_active());

        let t2 = t1 + Duration::from_secs(4);
        controller.handle_speech_event(SpeechEvent::SpeechEnded, t2);
        assert_eq!(controller.next_deadline(), Some(t2 + GRACE));

        controller.fire_due_timers(t2 + GRACE - Duration::from_millis(1));
        assert!(controller.is_call_active());

        controller.fire_due_timers(t2 + GRACE);
        assert_eq!(controller.state(), CallState::Idle);
        assert!(!controller.is_listening());
    }

    #[test]
    fn test_repeated_speech_end_does_not_push_back_hangup() {
        let log = CallLog::new();
        let t0 = Instant::now();
        let mut controller = connected(&log, t0);

        controller.handle_utterance("bye", t0);
        controller.handle_speech_event(SpeechEvent::SpeechEnded, t0);
        controller.handle_speech_event(SpeechEvent::SpeechEnded, t0 + Duration::from_secs(1));
        assert_eq!(controller.next_deadline(), Some(t0 + GRACE));
    }

    #[test]
    fn test_full_call_transcript() {
        let log = CallLog::new();
        let t0 = Instant::now();
        let mut controller = connected(&log, t0);

        for line in ["hi", "book appointment", "monday", "morning", "haircut"] {
            controller.handle_speech_event(SpeechEvent::utterance(line), t0);
            controller.handle_speech_event(SpeechEvent::SpeechStarted, t0);
            assert!(!controller.is_listening());
            controller.handle_speech_event(SpeechEvent::SpeechEnded, t0);
        }

        let transcript = controller.transcript();
        assert_eq!(transcript.len(), 11);
        assert_eq!(transcript.entries()[0].text, OPENING_GREETING);
        assert_eq!(transcript.entries()[1].text, "hi");
        assert!(log.speech_never_overlaps_capture());
    }

    #[test]
    fn test_cancelled_reply_end_during_next_greeting() {
        let log = CallLog::new();
        let t0 = Instant::now();
        let mut controller = connected(&log, t0);

        controller.handle_speech_event(SpeechEvent::utterance("where are you"), t0);
        controller.handle_speech_event(SpeechEvent::SpeechStarted, t0);
        controller.end(EndReason::Caller);

        let t1 = t0 + Duration::from_secs(1);
        controller.start(t1).unwrap();
        controller.fire_due_timers(t1 + GREETING_DELAY);
        controller.handle_speech_event(SpeechEvent::SpeechStarted, t1 + GREETING_DELAY);

        // the cancelled reply reports its end while the greeting plays
        controller.handle_speech_event(SpeechEvent::SpeechEnded, t1 + GREETING_DELAY);
        assert!(!controller.is_listening());
        assert!(controller.is_speaking());
        assert_eq!(controller.phase(), TurnPhase::Speaking);
        assert_eq!(
            log.calls().last(),
            Some(&CollaboratorCall::Speak(OPENING_GREETING.to_string()))
        );

        controller.handle_speech_event(SpeechEvent::SpeechEnded, t1 + GREETING_DELAY);
        assert!(controller.is_listening());
        assert!(log.speech_never_overlaps_capture());
    }

    #[test]
    fn test_cancelled_reply_end_between_calls() {
        let log = CallLog::new();
        let t0 = Instant::now();
        let mut controller = connected(&log, t0);
        controller.handle_utterance("price", t0);
        controller.end(EndReason::Caller);

        // reported while no call is active
        controller.handle_speech_event(SpeechEvent::SpeechEnded, t0);

        controller.start(t0).unwrap();
        controller.fire_due_timers(t0 + GREETING_DELAY);
        controller.handle_speech_event(SpeechEvent::SpeechEnded, t0 + GREETING_DELAY);
        assert_eq!(controller.phase(), TurnPhase::Listening);
        assert!(controller.is_listening());
    }

    #[test]
    fn test_speech_watchdog_resumes_listening() {
        let log = CallLog::new();
        let t0 = Instant::now();
        let mut controller = connected(&log, t0);

        controller.handle_utterance("hello", t0);
        assert_eq!(controller.next_deadline(), Some(t0 + SPEECH_TIMEOUT));

        log.clear();
        controller.fire_due_timers(t0 + SPEECH_TIMEOUT - Duration::from_millis(1));
        assert!(log.calls().is_empty());

        controller.fire_due_timers(t0 + SPEECH_TIMEOUT);
        assert_eq!(
            log.calls(),
            vec![CollaboratorCall::CancelSpeech, CollaboratorCall::StartCapture]
        );
        assert_eq!(controller.phase(), TurnPhase::Listening);
        assert_eq!(controller.next_deadline(), None);
    }

    #[test]
    fn test_speech_end_disarms_watchdog() {
        let log = CallLog::new();
        let t0 = Instant::now();
        let mut controller = connected(&log, t0);

        controller.handle_utterance("hello", t0);
        controller.handle_speech_event(SpeechEvent::SpeechEnded, t0 + Duration::from_secs(2));
        assert_eq!(controller.next_deadline(), None);
    }

    #[test]
    fn test_lost_farewell_end_still_hangs_up() {
        let log = CallLog::new();
        let t0 = Instant::now();
        let mut controller = connected(&log, t0);

        controller.handle_utterance("thank you, bye", t0);
        let t1 = t0 + SPEECH_TIMEOUT;
        controller.fire_due_timers(t1);
        assert!(controller.is_call_active());
        assert_eq!(controller.next_deadline(), Some(t1 + GRACE));

        controller.fire_due_timers(t1 + GRACE);
        assert_eq!(controller.state(), CallState::Idle);
    }

    #[test]
    fn test_capture_ended_restarts_while_listening() {
        let log = CallLog::new();
        let t0 = Instant::now();
        let mut controller = connected(&log, t0);

        controller.handle_speech_event(
            SpeechEvent::CaptureError {
                reason: "no-speech".into(),
            },
            t0,
        );
        controller.handle_speech_event(SpeechEvent::CaptureEnded, t0);
        assert!(controller.is_call_active());
        assert!(controller.is_listening());
        assert_eq!(log.count(&CollaboratorCall::StartCapture), 2);
    }

    #[test]
    fn test_events_after_end_are_ignored() {
        let log = CallLog::new();
        let t0 = Instant::now();
        let mut controller = connected(&log, t0);
        controller.end(EndReason::Caller);
        log.clear();

        controller.handle_speech_event(SpeechEvent::SpeechEnded, t0);
        controller.handle_speech_event(SpeechEvent::CaptureEnded, t0);
        controller.handle_speech_event(SpeechEvent::utterance("hello"), t0);
        assert!(log.calls().is_empty());
        assert!(!controller.transcript().is_empty());
    }

    #[test]
    fn test_new_call_clears_transcript() {
        let log = CallLog::new();
        let t0 = Instant::now();
        let mut controller = connected(&log, t0);
        controller.handle_utterance("hello", t0);
        controller.end(EndReason::Caller);
        assert_eq!(controller.transcript().len(), 3);

        controller.start(t0).unwrap();
        assert!(controller.transcript().is_empty());
    }

    #[test]
    fn test_greeting_with_unavailable_synthesis() {
        let log = CallLog::new();
        let mut controller = CallController::new(
            &VoiceSessionConfig::default(),
            Box::new(RecordingCapture::new(log.clone())),
            Box::new(RecordingSynthesis::unavailable(log.clone())),
        );
        let t0 = Instant::now();
        controller.start(t0).unwrap();
        controller.fire_due_timers(t0 + GREETING_DELAY);

        // greeting recorded, capture armed straight away
        assert_eq!(controller.transcript().len(), 1);
        assert_eq!(controller.phase(), TurnPhase::Listening);
        assert!(controller.is_listening());

        // farewell goes straight to the grace delay
        controller.handle_utterance("bye", t0 + GREETING_DELAY);
        assert_eq!(controller.next_deadline(), Some(t0 + GREETING_DELAY + GRACE));
    }

    #[test]
    fn test_snapshot_reflects_call() {
        let log = CallLog::new();
        let t0 = Instant::now();
        let controller = connected(&log, t0);

        let snapshot = controller.snapshot();
        assert!(snapshot.is_call_active);
        assert!(snapshot.is_listening);
        assert!(!snapshot.is_speaking);
        assert_eq!(snapshot.phase, TurnPhase::Listening);
        assert_eq!(snapshot.call_id.as_deref(), controller.call_id());
        assert_eq!(snapshot.transcript.len(), 1);
    }
}
