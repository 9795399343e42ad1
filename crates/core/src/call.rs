//! Call lifecycle and turn phase types

use serde::{Deserialize, Serialize};

/// Lifecycle of the single call handled by the front desk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    /// No call in progress
    #[default]
    Idle,
    /// Caller connected, conversation running
    Active,
    /// Call torn down. Transient, immediately reset to `Idle`
    Terminated,
}

impl CallState {
    /// Get allowed transitions from the current state
    pub fn allowed_transitions(&self) -> &'static [CallState] {
        match self {
            CallState::Idle => &[CallState::Active],
            CallState::Active => &[CallState::Terminated],
            CallState::Terminated => &[CallState::Idle],
        }
    }

    /// Check if transition to target state is allowed
    pub fn can_transition_to(&self, target: CallState) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::Idle => "idle",
            CallState::Active => "active",
            CallState::Terminated => "terminated",
        }
    }
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase of the listen / respond cycle inside an active call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// Not armed
    #[default]
    Idle,
    /// Capture running, waiting for a finalized utterance
    Listening,
    /// Classifying an utterance and picking the reply
    Processing,
    /// Agent speech in flight, capture stopped
    Speaking,
}

impl TurnPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnPhase::Idle => "idle",
            TurnPhase::Listening => "listening",
            TurnPhase::Processing => "processing",
            TurnPhase::Speaking => "speaking",
        }
    }
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
