//! Synthesis pipeline configuration

use serde::{Deserialize, Serialize};
use tts_gateway_core::{GenerationLimits, GenerationParams};

/// Which synthesis backend to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisBackend {
    /// Deterministic tone generator for development and tests
    #[default]
    Stub,
    /// HTTP model-serving sidecar
    Remote,
}

/// Synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Backend selection
    #[serde(default)]
    pub backend: SynthesisBackend,

    /// Maximum characters per chunk handed to the backend
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Whole-request deadline, checked between chunks
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,

    /// Load the backend at startup instead of on first request
    #[serde(default = "default_true")]
    pub warm_up: bool,

    /// Output sample rate of the stub backend
    #[serde(default = "default_sample_rate")]
    pub stub_sample_rate: u32,

    /// Remote backend settings
    #[serde(default)]
    pub remote: RemoteSynthesisConfig,
}

fn default_max_chunk_chars() -> usize {
    300
}
fn default_true() -> bool {
    true
}
fn default_sample_rate() -> u32 {
    24000
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            backend: SynthesisBackend::default(),
            max_chunk_chars: default_max_chunk_chars(),
            request_timeout_seconds: None,
            warm_up: true,
            stub_sample_rate: default_sample_rate(),
            remote: RemoteSynthesisConfig::default(),
        }
    }
}

/// Remote model-serving endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSynthesisConfig {
    /// Base URL of the sidecar, e.g. `http://127.0.0.1:8000`
    #[serde(default = "default_remote_url")]
    pub url: String,

    /// Per-call HTTP timeout
    #[serde(default = "default_remote_timeout")]
    pub timeout_seconds: u64,

    /// The model ships pre-computed speaker conditionals
    #[serde(default)]
    pub builtin_voice: bool,
}

fn default_remote_url() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_remote_timeout() -> u64 {
    120
}

impl Default for RemoteSynthesisConfig {
    fn default() -> Self {
        Self {
            url: default_remote_url(),
            timeout_seconds: default_remote_timeout(),
            builtin_voice: false,
        }
    }
}

/// Default generation parameters and the ranges a request may set them to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_exaggeration")]
    pub exaggeration: f32,

    #[serde(default = "default_cfg_weight")]
    pub cfg_weight: f32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f32,

    #[serde(default = "default_min_p")]
    pub min_p: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_true")]
    pub norm_loudness: bool,

    /// Output format for streamed chunks
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Accepted ranges
    #[serde(default)]
    pub ranges: GenerationLimits,
}

fn default_exaggeration() -> f32 {
    0.5
}
fn default_cfg_weight() -> f32 {
    0.5
}
fn default_temperature() -> f32 {
    0.8
}
fn default_repetition_penalty() -> f32 {
    1.2
}
fn default_min_p() -> f32 {
    0.05
}
fn default_top_p() -> f32 {
    1.0
}
fn default_top_k() -> u32 {
    1000
}
fn default_output_format() -> String {
    "pcm_16".to_string()
}

impl GenerationConfig {
    /// Default parameters, without a voice prompt
    pub fn default_params(&self) -> GenerationParams {
        GenerationParams {
            exaggeration: self.exaggeration,
            cfg_weight: self.cfg_weight,
            temperature: self.temperature,
            repetition_penalty: self.repetition_penalty,
            min_p: self.min_p,
            top_p: self.top_p,
            top_k: self.top_k,
            normalize_loudness: self.norm_loudness,
            voice_prompt: None,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            exaggeration: default_exaggeration(),
            cfg_weight: default_cfg_weight(),
            temperature: default_temperature(),
            repetition_penalty: default_repetition_penalty(),
            min_p: default_min_p(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            norm_loudness: true,
            output_format: default_output_format(),
            ranges: GenerationLimits::default(),
        }
    }
}
