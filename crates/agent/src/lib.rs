//! Call controller for the front desk
//!
//! Features:
//! - Call lifecycle state machine (idle, active, terminated)
//! - Turn taking between speech capture and synthesis
//! - Canned replies selected by intent
//! - Async voice session driver with snapshot and event channels

pub mod call;
pub mod controller;
pub mod response;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod turn;
pub mod voice_session;

pub mod intent {
    //! Intent classification
    //!
    //! Re-exported from front_desk_text_processing::intent.
    pub use front_desk_text_processing::intent::*;
}

pub use call::{CallRecord, CallSession};
pub use controller::CallController;
pub use response::{respond, Reply, SideEffect, OPENING_GREETING};
pub use turn::{TurnController, TurnResult, TurnSignal};
pub use voice_session::{
    CallSnapshot, EndReason, VoiceSession, VoiceSessionConfig, VoiceSessionEvent,
    VoiceSessionHandle,
};

pub use front_desk_text_processing::intent::{Classification, Intent, IntentClassifier};

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Core(#[from] front_desk_core::Error),

    #[error("Session task failed: {0}")]
    Session(String),
}

impl AgentError {
    /// `start` was requested while a call is in progress
    pub fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            AgentError::Core(front_desk_core::Error::InvalidTransition { .. })
        )
    }

    /// The session driver is gone
    pub fn is_closed(&self) -> bool {
        matches!(self, AgentError::Core(front_desk_core::Error::ChannelClosed))
    }
}
