//! Call lifecycle
//!
//! One `CallSession` exists for the whole process and is reused call after
//! call. `Terminated` is passed through on the way back to `Idle` so the
//! lifecycle stays `Idle -> Active -> Terminated -> Idle`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use front_desk_core::{CallState, Error, Result};

/// The single call slot
#[derive(Debug, Clone, Default)]
pub struct CallSession {
    id: Option<String>,
    state: CallState,
    started_at: Option<DateTime<Utc>>,
}

/// Summary of a call that has just ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl CallRecord {
    pub fn duration(&self) -> chrono::Duration {
        self.ended_at - self.started_at
    }
}

impl CallSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == CallState::Active
    }

    /// Id of the call in progress
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// `Idle -> Active` with a fresh call id
    pub fn start(&mut self) -> Result<CallState> {
        self.transition(CallState::Active, "start a call")?;
        self.id = Some(Uuid::new_v4().to_string());
        self.started_at = Some(Utc::now());
        Ok(self.state)
    }

    /// `Active -> Terminated -> Idle`
    ///
    /// Returns `None` when no call was active, leaving the session untouched.
    pub fn terminate(&mut self) -> Option<CallRecord> {
        if self.transition(CallState::Terminated, "end a call").is_err() {
            return None;
        }

        let record = CallRecord {
            id: self.id.take().unwrap_or_default(),
            started_at: self.started_at.take().unwrap_or_else(Utc::now),
            ended_at: Utc::now(),
        };

        // Terminated is never observable from outside
        self.state = CallState::Idle;
        Some(record)
    }

    fn transition(&mut self, to: CallState, action: &'static str) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                from: self.state,
                action,
            });
        }
        self.state = to;
        Ok(())
    }
}
