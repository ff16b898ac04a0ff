//! Synthesis requests
//!
//! [`JobInput`] is the loosely typed body clients send. Turning it into a
//! [`Job`] fills unset parameters from configuration and validates in a
//! fixed order: text, then parameter ranges, then the voice prompt. No
//! synthesis work starts until a job exists.

use serde::{Deserialize, Serialize};

use tts_gateway_config::Settings;
use tts_gateway_core::{validate_text, GenerationParams, ValidationError};

use crate::voice_prompt::VoicePromptResolver;
use crate::ServerError;

/// Request body for both the HTTP and WebSocket endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobInput {
    pub text: Option<String>,
    /// Reference clip, relative to the prompt directory
    pub audio_prompt: Option<String>,
    /// Stream chunks instead of returning one file (HTTP only)
    #[serde(default)]
    pub stream: bool,
    pub output_format: Option<String>,
    pub session_id: Option<String>,

    pub exaggeration: Option<f32>,
    pub cfg_weight: Option<f32>,
    pub temperature: Option<f32>,
    pub repetition_penalty: Option<f32>,
    pub min_p: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<i64>,
    pub norm_loudness: Option<bool>,
}

/// Validated request
#[derive(Debug, Clone)]
pub struct Job {
    pub text: String,
    pub params: GenerationParams,
    pub stream: bool,
    pub output_format: String,
    pub session_id: String,
}

impl JobInput {
    /// Validate and fill defaults from `settings`
    pub fn into_job(
        self,
        settings: &Settings,
        prompts: &VoicePromptResolver,
    ) -> Result<Job, ServerError> {
        let text = validate_text(self.text.as_deref(), settings.limits.max_text_length)?.to_string();

        let session_id = match self.session_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => uuid::Uuid::new_v4().to_string(),
        };

        let generation = &settings.generation;
        let limits = &generation.ranges;
        let defaults = generation.default_params();

        let top_k = match self.top_k {
            Some(k) => to_top_k(k, limits.top_k.min, limits.top_k.max)?,
            None => defaults.top_k,
        };

        let mut params = GenerationParams {
            exaggeration: self.exaggeration.unwrap_or(defaults.exaggeration),
            cfg_weight: self.cfg_weight.unwrap_or(defaults.cfg_weight),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            repetition_penalty: self.repetition_penalty.unwrap_or(defaults.repetition_penalty),
            min_p: self.min_p.unwrap_or(defaults.min_p),
            top_p: self.top_p.unwrap_or(defaults.top_p),
            top_k,
            normalize_loudness: self.norm_loudness.unwrap_or(defaults.normalize_loudness),
            voice_prompt: None,
        };
        params.validate(limits)?;

        if let Some(name) = self.audio_prompt.as_deref().filter(|n| !n.trim().is_empty()) {
            params.voice_prompt = Some(prompts.resolve(name)?);
        }

        let output_format = self
            .output_format
            .unwrap_or_else(|| generation.output_format.clone());

        tracing::debug!(
            session_id = %session_id,
            chars = text.chars().count(),
            stream = self.stream,
            voice_prompt = params.voice_prompt.is_some(),
            "Accepted synthesis request"
        );

        Ok(Job {
            text,
            params,
            stream: self.stream,
            output_format,
            session_id,
        })
    }
}

/// Range-check before narrowing, so negative values report as out of range
fn to_top_k(value: i64, min: f64, max: f64) -> Result<u32, ValidationError> {
    let out_of_range = || ValidationError::OutOfRange {
        field: "top_k",
        value: value as f64,
        min,
        max,
    };

    if (value as f64) < min || (value as f64) > max {
        return Err(out_of_range());
    }
    u32::try_from(value).map_err(|_| out_of_range())
}
