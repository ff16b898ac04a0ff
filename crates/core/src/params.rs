//! Generation parameters
//!
//! One [`GenerationParams`] value is built per request and handed unchanged to
//! every chunk's synthesis call, so sampling settings and the voice prompt
//! cannot drift between chunks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Resolved reference audio for voice cloning.
///
/// Cloning shares the underlying path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoicePrompt(Arc<Path>);

impl VoicePrompt {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(Arc::from(path.into()))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for VoicePrompt {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Sampling and conditioning parameters for one request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Emotion intensity
    pub exaggeration: f32,
    /// Classifier-free guidance weight
    pub cfg_weight: f32,
    pub temperature: f32,
    pub repetition_penalty: f32,
    pub min_p: f32,
    pub top_p: f32,
    pub top_k: u32,
    /// Normalize reference audio loudness before conditioning
    pub normalize_loudness: bool,
    pub voice_prompt: Option<VoicePrompt>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            exaggeration: 0.5,
            cfg_weight: 0.5,
            temperature: 0.8,
            repetition_penalty: 1.2,
            min_p: 0.05,
            top_p: 1.0,
            top_k: 1000,
            normalize_loudness: true,
            voice_prompt: None,
        }
    }
}

impl GenerationParams {
    /// Attach a voice prompt
    pub fn with_voice_prompt(mut self, prompt: VoicePrompt) -> Self {
        self.voice_prompt = Some(prompt);
        self
    }

    /// Check every numeric field against `limits`, reporting the first
    /// out-of-range field.
    pub fn validate(&self, limits: &GenerationLimits) -> Result<(), ValidationError> {
        let checks = [
            ("exaggeration", self.exaggeration as f64, limits.exaggeration),
            ("cfg_weight", self.cfg_weight as f64, limits.cfg_weight),
            ("temperature", self.temperature as f64, limits.temperature),
            (
                "repetition_penalty",
                self.repetition_penalty as f64,
                limits.repetition_penalty,
            ),
            ("min_p", self.min_p as f64, limits.min_p),
            ("top_p", self.top_p as f64, limits.top_p),
            ("top_k", self.top_k as f64, limits.top_k),
        ];

        for (field, value, range) in checks {
            range.check(field, value)?;
        }

        Ok(())
    }
}

/// Inclusive numeric range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
}

impl ParamRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Accepts every finite value
    pub const fn unbounded() -> Self {
        Self::new(f64::MIN, f64::MAX)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    fn check(&self, field: &'static str, value: f64) -> Result<(), ValidationError> {
        if self.contains(value) {
            Ok(())
        } else {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// Accepted ranges for each generation parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationLimits {
    #[serde(default = "default_unit_range")]
    pub exaggeration: ParamRange,
    #[serde(default = "default_unit_range")]
    pub cfg_weight: ParamRange,
    #[serde(default = "default_temperature_range")]
    pub temperature: ParamRange,
    #[serde(default = "default_repetition_penalty_range")]
    pub repetition_penalty: ParamRange,
    #[serde(default = "default_unit_range")]
    pub min_p: ParamRange,
    #[serde(default = "default_unit_range")]
    pub top_p: ParamRange,
    #[serde(default = "default_top_k_range")]
    pub top_k: ParamRange,
}

fn default_unit_range() -> ParamRange {
    ParamRange::new(0.0, 1.0)
}
fn default_temperature_range() -> ParamRange {
    ParamRange::new(0.05, 2.0)
}
fn default_repetition_penalty_range() -> ParamRange {
    ParamRange::unbounded()
}
fn default_top_k_range() -> ParamRange {
    ParamRange::new(0.0, 1000.0)
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self {
            exaggeration: default_unit_range(),
            cfg_weight: default_unit_range(),
            temperature: default_temperature_range(),
            repetition_penalty: default_repetition_penalty_range(),
            min_p: default_unit_range(),
            top_p: default_unit_range(),
            top_k: default_top_k_range(),
        }
    }
}

/// Validate the request text, returning it on success.
///
/// Length is counted in characters, not bytes.
pub fn validate_text(text: Option<&str>, max_length: usize) -> Result<&str, ValidationError> {
    let text = match text {
        Some(t) if !t.trim().is_empty() => t,
        _ => return Err(ValidationError::Missing("text")),
    };

    let length = text.chars().count();
    if length > max_length {
        return Err(ValidationError::TextTooLong {
            length,
            max: max_length,
        });
    }

    Ok(text)
}
