//! Core traits for the front desk
//!
//! The call controller only talks to the outside world through these
//! traits, which keeps it testable with recording mocks.
//!
//! ```text
//! Speech:
//!   - SpeechCapture:   start / stop continuous recognition
//!   - SpeechSynthesis: speak / cancel utterances
//!   - SpeechEvent:     what both report back
//! ```

mod speech;

pub use speech::{SpeechCapture, SpeechEvent, SpeechSynthesis};
