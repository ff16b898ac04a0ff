//! Error types for the TTS gateway

use thiserror::Error;

/// Main error type shared across the gateway crates
#[derive(Error, Debug)]
pub enum Error {
    // Request validation errors
    #[error("{0}")]
    Validation(#[from] ValidationError),

    // Reference audio errors
    #[error("{0}")]
    VoicePrompt(#[from] VoicePromptError),

    // Audio errors
    #[error("Audio processing error: {0}")]
    Audio(#[from] AudioError),

    // Output format errors
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
}

/// Request validation errors, detected before any synthesis call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing '{0}' parameter")]
    Missing(&'static str),

    #[error("Text length exceeds maximum of {max} (got {length})")]
    TextTooLong { length: usize, max: usize },

    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Voice prompt (reference audio) errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VoicePromptError {
    #[error("Audio prompt not found: {0}")]
    NotFound(String),

    #[error("Unsupported audio format: {0}")]
    UnsupportedExtension(String),

    #[error("Invalid audio_prompt path: path traversal detected ({0})")]
    PathTraversal(String),

    #[error("Either 'audio_prompt' must be provided for voice cloning, or the synthesizer must have a built-in voice")]
    Required,
}

/// Audio buffer errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    #[error("Sample rate mismatch: expected {expected} Hz, got {actual} Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },

    #[error("Shape mismatch: shape holds {expected} samples, buffer has {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Expected mono audio, got {channels} channels")]
    NotMono { channels: usize },

    #[error("Non-finite sample at index {0}")]
    NonFinite(usize),

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("No audio segments to assemble")]
    Empty,
}
