//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use front_desk_core::{CaptureConfig, VoiceConfig};

use crate::constants::{channels, server, speech, timing};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - permissive CORS allowed
    #[default]
    Development,
    /// Staging mode
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Call timing and session channels
    #[serde(default)]
    pub call: CallConfig,

    /// Recognition and synthesis parameters
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_call()?;
        self.validate_speech()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if self.environment.is_production() && !self.server.cors_enabled {
            return Err(ConfigError::InvalidValue {
                field: "server.cors_enabled".to_string(),
                message: "CORS must be enabled in production".to_string(),
            });
        }

        Ok(())
    }

    fn validate_call(&self) -> Result<(), ConfigError> {
        let call = &self.call;

        if call.greeting_delay_ms > timing::MAX_GREETING_DELAY_MS {
            return Err(ConfigError::InvalidValue {
                field: "call.greeting_delay_ms".to_string(),
                message: format!(
                    "Must be at most {}ms, got {}",
                    timing::MAX_GREETING_DELAY_MS,
                    call.greeting_delay_ms
                ),
            });
        }

        if call.hangup_grace_ms > timing::MAX_HANGUP_GRACE_MS {
            return Err(ConfigError::InvalidValue {
                field: "call.hangup_grace_ms".to_string(),
                message: format!(
                    "Must be at most {}ms, got {}",
                    timing::MAX_HANGUP_GRACE_MS,
                    call.hangup_grace_ms
                ),
            });
        }

        if call.speech_timeout_ms == 0 || call.speech_timeout_ms > timing::MAX_SPEECH_TIMEOUT_MS {
            return Err(ConfigError::InvalidValue {
                field: "call.speech_timeout_ms".to_string(),
                message: format!(
                    "Must be between 1 and {}ms, got {}",
                    timing::MAX_SPEECH_TIMEOUT_MS,
                    call.speech_timeout_ms
                ),
            });
        }

        if call.event_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                field: "call.event_buffer".to_string(),
                message: "Event buffer cannot be 0".to_string(),
            });
        }

        Ok(())
    }

    fn validate_speech(&self) -> Result<(), ConfigError> {
        let s = &self.speech;

        if s.locale.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "speech.locale".to_string(),
                message: "Locale cannot be empty".to_string(),
            });
        }

        if !(s.rate > speech::MIN_RATE && s.rate <= speech::MAX_RATE) {
            return Err(ConfigError::InvalidValue {
                field: "speech.rate".to_string(),
                message: format!(
                    "Must be in ({}, {}], got {}",
                    speech::MIN_RATE,
                    speech::MAX_RATE,
                    s.rate
                ),
            });
        }

        if !(speech::MIN_PITCH..=speech::MAX_PITCH).contains(&s.pitch) {
            return Err(ConfigError::InvalidValue {
                field: "speech.pitch".to_string(),
                message: format!(
                    "Must be between {} and {}, got {}",
                    speech::MIN_PITCH,
                    speech::MAX_PITCH,
                    s.pitch
                ),
            });
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Restrict CORS to `cors_origins`
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    server::HOST.to_string()
}
fn default_port() -> u16 {
    server::PORT
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: default_true(),
            // Empty by default - must be explicitly configured outside development
            cors_origins: Vec::new(),
        }
    }
}

/// Call timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallConfig {
    /// Delay before the opening greeting (ms)
    #[serde(default = "default_greeting_delay_ms")]
    pub greeting_delay_ms: u64,

    /// Delay between the end of the farewell line and hang-up (ms)
    #[serde(default = "default_hangup_grace_ms")]
    pub hangup_grace_ms: u64,

    /// Give up waiting for speech-ended after this long (ms)
    #[serde(default = "default_speech_timeout_ms")]
    pub speech_timeout_ms: u64,

    /// Capacity of the session command and event channels
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_greeting_delay_ms() -> u64 {
    timing::GREETING_DELAY_MS
}
fn default_hangup_grace_ms() -> u64 {
    timing::HANGUP_GRACE_MS
}
fn default_speech_timeout_ms() -> u64 {
    timing::SPEECH_TIMEOUT_MS
}
fn default_event_buffer() -> usize {
    channels::EVENT_BUFFER
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            greeting_delay_ms: default_greeting_delay_ms(),
            hangup_grace_ms: default_hangup_grace_ms(),
            speech_timeout_ms: default_speech_timeout_ms(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl CallConfig {
    pub fn greeting_delay(&self) -> Duration {
        Duration::from_millis(self.greeting_delay_ms)
    }

    pub fn hangup_grace(&self) -> Duration {
        Duration::from_millis(self.hangup_grace_ms)
    }

    pub fn speech_timeout(&self) -> Duration {
        Duration::from_millis(self.speech_timeout_ms)
    }
}

/// Speech collaborator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Locale for recognition and synthesis
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Speaking rate
    #[serde(default = "default_rate")]
    pub rate: f32,

    /// Speaking pitch
    #[serde(default = "default_pitch")]
    pub pitch: f32,

    /// Continuous recognition
    #[serde(default = "default_true")]
    pub continuous: bool,

    /// Deliver interim recognition results
    #[serde(default)]
    pub interim_results: bool,
}

fn default_locale() -> String {
    speech::LOCALE.to_string()
}
fn default_rate() -> f32 {
    speech::RATE
}
fn default_pitch() -> f32 {
    speech::PITCH
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            rate: default_rate(),
            pitch: default_pitch(),
            continuous: true,
            interim_results: false,
        }
    }
}

impl SpeechConfig {
    /// Voice parameters handed to the synthesizer
    pub fn voice(&self) -> VoiceConfig {
        VoiceConfig::new(self.locale.clone())
            .with_rate(self.rate)
            .with_pitch(self.pitch)
    }

    /// Recognition parameters handed to the capture provider
    pub fn capture(&self) -> CaptureConfig {
        CaptureConfig {
            locale: self.locale.clone(),
            continuous: self.continuous,
            interim_results: self.interim_results,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from `config/` and the environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (FRONT_DESK_ prefix)
/// 2. config/{env}.* (if env specified)
/// 3. config/default.*
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Load settings from an explicit configuration directory
pub fn load_settings_from(config_dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    let default_path = config_dir.join("default");
    builder = builder.add_source(File::with_name(&default_path.to_string_lossy()).required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        let env_path = config_dir.join(env_name);
        builder = builder.add_source(File::with_name(&env_path.to_string_lossy()).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix("FRONT_DESK")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    // Validate
    settings.validate()?;

    tracing::debug!(
        config_dir = %config_dir.display(),
        env = env.unwrap_or("default"),
        "Settings loaded"
    );

    Ok(settings)
}
