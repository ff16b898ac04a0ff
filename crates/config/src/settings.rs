//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{ConfigError, GenerationConfig, SynthesisConfig};

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Synthesis backend and chunking
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Request limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Generation defaults and ranges
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Reference audio for voice cloning
    #[serde(default)]
    pub voice_prompts: VoicePromptConfig,

    /// Batch output persistence
    #[serde(default)]
    pub output: OutputConfig,

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
        if self.synthesis.max_chunk_chars == 0 {
            return Err(ConfigError::InvalidValue {
                field: "synthesis.max_chunk_chars".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if self.limits.max_text_length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.max_text_length".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if self.synthesis.stub_sample_rate == 0 {
            return Err(ConfigError::InvalidValue {
                field: "synthesis.stub_sample_rate".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if self.synthesis.request_timeout_seconds == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "synthesis.request_timeout_seconds".to_string(),
                message: "must be greater than zero when set".to_string(),
            });
        }

        let params = self.generation.default_params();
        if let Err(e) = params.validate(&self.generation.ranges) {
            return Err(ConfigError::InvalidValue {
                field: "generation".to_string(),
                message: format!("default outside accepted range: {}", e),
            });
        }

        if self.generation.output_format.parse::<tts_gateway_core::AudioEncoding>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: "generation.output_format".to_string(),
                message: format!("unsupported format '{}'", self.generation.output_format),
            });
        }

        let prompts = &self.voice_prompts;
        if prompts.min_duration_seconds > prompts.max_duration_seconds {
            return Err(ConfigError::InvalidValue {
                field: "voice_prompts.min_duration_seconds".to_string(),
                message: "must not exceed max_duration_seconds".to_string(),
            });
        }

        if self.output.cleanup_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "output.cleanup_interval_seconds".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if !prompts.directory.exists() {
            tracing::warn!(
                directory = %prompts.directory.display(),
                "Voice prompt directory not found; requests with audio_prompt will fail"
            );
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
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
            // Empty allows any origin
            cors_origins: Vec::new(),
        }
    }
}

/// Request limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum characters of input text per request
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
}

fn default_max_text_length() -> usize {
    2000
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_text_length: default_max_text_length(),
        }
    }
}

/// Voice prompt directory and checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoicePromptConfig {
    /// Directory holding reference audio files
    #[serde(default = "default_prompt_directory")]
    pub directory: PathBuf,

    /// Accepted file extensions, lowercase without dot
    #[serde(default = "default_prompt_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Shortest recommended prompt; shorter ones are logged
    #[serde(default = "default_min_duration")]
    pub min_duration_seconds: f64,

    /// Longest recommended prompt; longer ones are logged
    #[serde(default = "default_max_duration")]
    pub max_duration_seconds: f64,
}

fn default_prompt_directory() -> PathBuf {
    PathBuf::from("voice_prompts")
}
fn default_prompt_extensions() -> Vec<String> {
    ["wav", "mp3", "m4a", "ogg", "flac", "webm", "aac", "opus"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_min_duration() -> f64 {
    3.0
}
fn default_max_duration() -> f64 {
    30.0
}

impl Default for VoicePromptConfig {
    fn default() -> Self {
        Self {
            directory: default_prompt_directory(),
            allowed_extensions: default_prompt_extensions(),
            min_duration_seconds: default_min_duration(),
            max_duration_seconds: default_max_duration(),
        }
    }
}

/// Batch output persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where finished WAV files are written
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    /// Files older than this are deleted
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,

    /// How often the retention sweep runs
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,

    /// Public base URL the output directory is served from. When set, batch
    /// responses carry `audio_url` instead of inline base64.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("output")
}
fn default_retention_hours() -> u64 {
    24
}
fn default_cleanup_interval() -> u64 {
    600
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            retention_hours: default_retention_hours(),
            cleanup_interval_seconds: default_cleanup_interval(),
            public_base_url: None,
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

    /// OTLP endpoint for traces
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// Enable metrics
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
            otlp_endpoint: None,
            metrics_enabled: true,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (TTS_GATEWAY_ prefix)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from("config", env)
}

/// Load settings from a specific configuration directory
pub fn load_settings_from(dir: &str, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name(&format!("{}/default", dir)).required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("{}/{}", dir, env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("TTS_GATEWAY")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.limits.max_text_length, 2000);
        assert_eq!(settings.synthesis.max_chunk_chars, 300);
        assert_eq!(settings.output.retention_hours, 24);
        assert_eq!(settings.voice_prompts.allowed_extensions.len(), 8);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::default();
        settings.synthesis.max_chunk_chars = 0;
        assert!(settings.validate().is_err());

        settings.synthesis.max_chunk_chars = 200;
        assert!(settings.validate().is_ok());

        settings.generation.temperature = 5.0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_unknown_output_format_rejected() {
        let mut settings = Settings::default();
        settings.generation.output_format = "mp3".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("default.yaml")).unwrap();
        writeln!(
            file,
            "synthesis:\n  max_chunk_chars: 550\nlimits:\n  max_text_length: 4000\ngeneration:\n  temperature: 0.6"
        )
        .unwrap();

        let settings = load_settings_from(dir.path().to_str().unwrap(), None).unwrap();
        assert_eq!(settings.synthesis.max_chunk_chars, 550);
        assert_eq!(settings.limits.max_text_length, 4000);
        assert_eq!(settings.generation.temperature, 0.6);
        // Untouched sections keep their defaults
        assert_eq!(settings.generation.top_k, 1000);
    }
}
