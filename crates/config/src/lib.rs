//! Configuration management for the front desk
//!
//! Supports loading configuration from:
//! - YAML/TOML/JSON files (`config/default.*`, `config/{env}.*`)
//! - Environment variables (FRONT_DESK_ prefix, `__` between sections)
//! - Runtime overrides on the returned [`Settings`]

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, load_settings_from, CallConfig, ObservabilityConfig, RuntimeEnvironment,
    ServerConfig, Settings, SpeechConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(path) => ConfigError::FileNotFound(path),
            other => ConfigError::ParseError(other.to_string()),
        }
    }
}
