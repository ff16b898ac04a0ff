//! Chunked synthesis pipeline
//!
//! This crate turns arbitrarily long text into audio using a backend that
//! only handles bounded input:
//! - Boundary-aware text segmentation
//! - Sequential per-chunk synthesis through a single shared backend
//! - Batch assembly into one waveform
//! - Per-chunk streaming with cooperative cancellation

pub mod orchestrator;
pub mod tts;

// TTS exports
pub use tts::{
    assemble, segment, AudioAssembler, BoundaryKind, RemoteSynthesizer, SegmenterConfig,
    SpeechSynthesizer, StreamEvent, StreamingChannelAdapter, StubSynthesizer, SynthesisFailure,
    SynthesisHandle, SynthesisStream, SynthesizerFactory, TextChunk, TextSegmenter,
};

// Orchestrator exports
pub use orchestrator::{ChunkedSynthesisOrchestrator, OrchestratorConfig};

use thiserror::Error;
use tts_gateway_core::{AudioError, ValidationError, VoicePromptError};

/// Pipeline errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    VoicePrompt(#[from] VoicePromptError),

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Synthesis failed on chunk {chunk_index}: {cause}")]
    Synthesis {
        chunk_index: usize,
        cause: SynthesisFailure,
    },

    #[error("Synthesis backend unavailable: {0}")]
    Backend(SynthesisFailure),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Request deadline exceeded after {completed_chunks} of {total_chunks} chunks")]
    DeadlineExceeded {
        completed_chunks: usize,
        total_chunks: usize,
    },
}

impl PipelineError {
    /// Short label for metrics
    pub fn error_type(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation",
            PipelineError::VoicePrompt(_) => "voice_prompt",
            PipelineError::UnsupportedFormat(_) => "format",
            PipelineError::Synthesis { .. } => "synthesis",
            PipelineError::Backend(_) => "backend",
            PipelineError::Audio(_) => "audio",
            PipelineError::DeadlineExceeded { .. } => "deadline",
        }
    }

    /// Index of the chunk that failed, for synthesis failures
    pub fn chunk_index(&self) -> Option<usize> {
        match self {
            PipelineError::Synthesis { chunk_index, .. } => Some(*chunk_index),
            _ => None,
        }
    }
}

impl From<tts_gateway_core::Error> for PipelineError {
    fn from(err: tts_gateway_core::Error) -> Self {
        use tts_gateway_core::Error;
        match err {
            Error::Validation(e) => PipelineError::Validation(e),
            Error::VoicePrompt(e) => PipelineError::VoicePrompt(e),
            Error::Audio(e) => PipelineError::Audio(e),
            Error::UnsupportedFormat(f) => PipelineError::UnsupportedFormat(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesis_error_message() {
        let err = PipelineError::Synthesis {
            chunk_index: 1,
            cause: SynthesisFailure::Backend("CUDA out of memory".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Synthesis failed on chunk 1: backend error: CUDA out of memory"
        );
        assert_eq!(err.chunk_index(), Some(1));
        assert_eq!(err.error_type(), "synthesis");
    }

    #[test]
    fn test_from_core_error() {
        let err: PipelineError = tts_gateway_core::Error::UnsupportedFormat("mp3".into()).into();
        assert_eq!(err, PipelineError::UnsupportedFormat("mp3".into()));
        assert_eq!(err.to_string(), "Unsupported output format: mp3");
    }
}
