//! Error types shared by every crate in the workspace

use thiserror::Error;

use crate::call::CallState;

/// Result alias using the core [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Core errors
///
/// None of these end a call on their own. Capture and synthesis failures are
/// logged by the controller and the call carries on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Recognition failed mid-capture. Recovered when capture ends and is restarted.
    #[error("Capture error: {0}")]
    Capture(String),

    /// Capture could not be started (already running, permission denied, ...)
    #[error("Capture start failed: {0}")]
    CaptureStart(String),

    /// No synthesizer is available, the reply is recorded but not spoken
    #[error("Speech synthesis unavailable")]
    SynthesisUnavailable,

    /// Operation not valid in the current call state
    #[error("Cannot {action} while call is {from}")]
    InvalidTransition { from: CallState, action: &'static str },

    /// The session driver has shut down
    #[error("Session channel closed")]
    ChannelClosed,
}

impl Error {
    /// Whether the error is expected during normal operation and only needs logging
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Capture(_) | Error::CaptureStart(_) | Error::SynthesisUnavailable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_message() {
        let err = Error::InvalidTransition {
            from: CallState::Active,
            action: "start a call",
        };
        assert_eq!(err.to_string(), "Cannot start a call while call is active");
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::Capture("no-speech".into()).is_recoverable());
        assert!(Error::CaptureStart("not-allowed".into()).is_recoverable());
        assert!(Error::SynthesisUnavailable.is_recoverable());
        assert!(!Error::ChannelClosed.is_recoverable());
    }
}
