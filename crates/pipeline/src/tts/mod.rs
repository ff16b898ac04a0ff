//! Chunked Text-to-Speech
//!
//! Features:
//! - Boundary-aware segmentation of long text
//! - Single-instance backend behind a lazily initialised handle
//! - Batch assembly and per-chunk streaming
//! - Multiple backend support (stub, remote sidecar)

mod assembler;
mod chunker;
mod handle;
mod remote;
mod streaming;
mod stub;

pub use assembler::{assemble, AudioAssembler};
pub use chunker::{segment, BoundaryKind, SegmenterConfig, TextChunk, TextSegmenter};
pub use handle::{SynthesisHandle, SynthesizerFactory};
pub use remote::RemoteSynthesizer;
pub use streaming::{StreamEvent, StreamingChannelAdapter, SynthesisStream};
pub use stub::StubSynthesizer;

use thiserror::Error;
use tts_gateway_core::{AudioError, GenerationParams, RawWaveform};

/// Failure reported by a synthesis backend for one call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthesisFailure {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("invalid backend output: {0}")]
    InvalidOutput(#[from] AudioError),
}

/// TTS backend trait
///
/// Backends are stateful and not reentrant, hence `&mut self`. The
/// [`SynthesisHandle`] serializes access so only one call runs at a time.
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send {
    /// Synthesize one chunk of text
    async fn synthesize(
        &mut self,
        text: &str,
        params: &GenerationParams,
    ) -> Result<RawWaveform, SynthesisFailure>;

    /// Get sample rate
    fn sample_rate(&self) -> u32;

    /// Can synthesize without a reference voice prompt?
    fn has_builtin_voice(&self) -> bool {
        false
    }

    /// Backend name for logs
    fn name(&self) -> &str;
}
