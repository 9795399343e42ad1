//! Voice and capture configuration passed to the speech collaborators

use serde::{Deserialize, Serialize};

/// Default locale for both recognition and synthesis
pub const DEFAULT_LOCALE: &str = "en-IN";

/// Voice configuration for TTS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// BCP 47 locale of the voice
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Speaking rate (1.0 = normal)
    #[serde(default = "default_rate")]
    pub rate: f32,
    /// Pitch (1.0 = normal)
    #[serde(default = "default_pitch")]
    pub pitch: f32,
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

fn default_rate() -> f32 {
    0.9
}

fn default_pitch() -> f32 {
    1.0
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            rate: default_rate(),
            pitch: default_pitch(),
        }
    }
}

impl VoiceConfig {
    /// Create a voice config for the given locale
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            ..Default::default()
        }
    }

    /// Set the speaking rate
    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate.clamp(0.1, 10.0);
        self
    }

    /// Set the pitch
    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch.clamp(0.0, 2.0);
        self
    }
}

/// Speech recognition settings
///
/// Capture is continuous and reports final results only. Interim results
/// would feed half-finished phrases into the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// BCP 47 locale for recognition
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Keep capturing across phrases
    #[serde(default = "default_true")]
    pub continuous: bool,
    /// Deliver partial hypotheses
    #[serde(default)]
    pub interim_results: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            continuous: true,
            interim_results: false,
        }
    }
}
