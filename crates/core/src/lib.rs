//! Core traits and types for the front desk voice agent
//!
//! This crate provides foundational types used across all other crates:
//! - Collaborator traits for speech capture (STT) and synthesis (TTS)
//! - Speech events delivered by those collaborators
//! - Call lifecycle and turn phase enums
//! - Transcript types
//! - Voice and capture configuration
//! - Error types

pub mod call;
pub mod error;
pub mod traits;
pub mod transcript;
pub mod voice_config;

pub use call::{CallState, TurnPhase};
pub use error::{Error, Result};
pub use transcript::{Speaker, Transcript, TranscriptEntry};
pub use voice_config::{CaptureConfig, VoiceConfig};

pub use traits::{SpeechCapture, SpeechEvent, SpeechSynthesis};
