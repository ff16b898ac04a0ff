//! Core types for the TTS gateway
//!
//! This crate provides foundational types used across all other crates:
//! - Generation parameters and voice prompts
//! - Raw and normalized waveforms, wire encoding
//! - Error types

pub mod audio;
pub mod error;
pub mod params;

pub use audio::{
    encode_pcm16, AssembledAudio, AudioEncoding, RawWaveform, SampleBuffer, WaveShape,
    WaveformSegment,
};
pub use error::{AudioError, Error, ValidationError, VoicePromptError};
pub use params::{validate_text, GenerationLimits, GenerationParams, ParamRange, VoicePrompt};
