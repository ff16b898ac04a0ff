//! Configuration management for the TTS gateway
//!
//! Supports loading configuration from:
//! - YAML/TOML files
//! - Environment variables (TTS_GATEWAY_ prefix)

pub mod pipeline;
pub mod settings;

pub use pipeline::{GenerationConfig, RemoteSynthesisConfig, SynthesisBackend, SynthesisConfig};
pub use settings::{
    load_settings, load_settings_from, LimitsConfig, ObservabilityConfig, OutputConfig,
    ServerConfig, Settings, VoicePromptConfig,
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
        ConfigError::ParseError(err.to_string())
    }
}
