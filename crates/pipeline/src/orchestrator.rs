//! Chunked Synthesis Orchestrator
//!
//! Segments text, then drives the shared backend once per chunk in order.
//! The same [`GenerationParams`] (including the voice prompt) is passed to
//! every call so the speaker stays constant across chunks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::tts::{AudioAssembler, StreamingChannelAdapter, SynthesisHandle, SynthesisStream, TextChunk, TextSegmenter};
use crate::PipelineError;
use tts_gateway_core::{AssembledAudio, GenerationParams, VoicePromptError, WaveformSegment};

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum characters per chunk
    pub max_chunk_chars: usize,
    /// Whole-request deadline, checked before each chunk
    pub request_timeout: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 300,
            request_timeout: None,
        }
    }
}

/// Drives sequential per-chunk synthesis for one request at a time
#[derive(Debug, Clone)]
pub struct ChunkedSynthesisOrchestrator {
    handle: Arc<SynthesisHandle>,
    segmenter: TextSegmenter,
    request_timeout: Option<Duration>,
}

impl ChunkedSynthesisOrchestrator {
    /// Create a new orchestrator over a shared backend handle
    pub fn new(handle: Arc<SynthesisHandle>, config: OrchestratorConfig) -> Self {
        Self {
            handle,
            segmenter: TextSegmenter::with_max_chars(config.max_chunk_chars),
            request_timeout: config.request_timeout,
        }
    }

    /// Shared backend handle
    pub fn handle(&self) -> &Arc<SynthesisHandle> {
        &self.handle
    }

    /// Maximum characters per chunk
    pub fn max_chunk_chars(&self) -> usize {
        self.segmenter.max_chars()
    }

    /// Split text into chunks with the configured limit
    pub fn segment(&self, text: &str) -> Vec<TextChunk> {
        self.segmenter.segment(text)
    }

    /// Synthesize the whole text and return the assembled audio.
    ///
    /// Stops at the first failing chunk; no partial audio is returned.
    pub async fn orchestrate(
        &self,
        text: &str,
        params: &GenerationParams,
    ) -> Result<AssembledAudio, PipelineError> {
        let start = Instant::now();
        self.require_voice(params).await?;

        let chunks = self.segment(text);
        let deadline = self.deadline(start);

        tracing::info!(
            chunks = chunks.len(),
            chars = text.chars().count(),
            max_chunk_chars = self.max_chunk_chars(),
            "Starting chunked synthesis"
        );

        let mut assembler = AudioAssembler::new();
        for chunk in &chunks {
            check_deadline(deadline, chunk.index, chunks.len())?;
            let segment = self.synthesize_chunk(chunk, params).await?;
            assembler.push(segment)?;
        }

        let audio = assembler.finish()?;

        tracing::info!(
            chunks = chunks.len(),
            duration_sec = audio.duration_seconds,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Chunked synthesis complete"
        );

        Ok(audio)
    }

    /// Stream the text chunk by chunk
    pub fn stream(&self, text: impl Into<String>, params: GenerationParams, format: &str) -> SynthesisStream {
        StreamingChannelAdapter::new(self.clone()).stream(text, params, format)
    }

    /// Fail with [`VoicePromptError::Required`] when there is neither a voice
    /// prompt nor a built-in voice.
    pub(crate) async fn require_voice(&self, params: &GenerationParams) -> Result<(), PipelineError> {
        if params.voice_prompt.is_some() {
            return Ok(());
        }

        let builtin = self
            .handle
            .has_builtin_voice()
            .await
            .map_err(PipelineError::Backend)?;

        if builtin {
            Ok(())
        } else {
            Err(VoicePromptError::Required.into())
        }
    }

    pub(crate) fn deadline(&self, start: Instant) -> Option<Instant> {
        self.request_timeout.map(|t| start + t)
    }

    /// Synthesize and normalize one chunk
    pub(crate) async fn synthesize_chunk(
        &self,
        chunk: &TextChunk,
        params: &GenerationParams,
    ) -> Result<WaveformSegment, PipelineError> {
        let start = Instant::now();

        let raw = self
            .handle
            .synthesize(&chunk.text, params)
            .await
            .map_err(|cause| {
                tracing::warn!(chunk = chunk.index, error = %cause, "Chunk synthesis failed");
                PipelineError::Synthesis {
                    chunk_index: chunk.index,
                    cause,
                }
            })?;

        let segment = raw.into_segment().map_err(|e| PipelineError::Synthesis {
            chunk_index: chunk.index,
            cause: e.into(),
        })?;

        let elapsed = start.elapsed();
        metrics::counter!("tts_gateway_chunks_synthesized_total").increment(1);
        metrics::histogram!("tts_gateway_chunk_synthesis_seconds").record(elapsed.as_secs_f64());

        tracing::debug!(
            chunk = chunk.index,
            chars = chunk.char_len(),
            boundary = ?chunk.boundary,
            samples = segment.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Chunk synthesized"
        );

        Ok(segment)
    }
}

/// Abort before starting chunk `index` once the deadline has passed
pub(crate) fn check_deadline(
    deadline: Option<Instant>,
    index: usize,
    total: usize,
) -> Result<(), PipelineError> {
    match deadline {
        Some(d) if Instant::now() >= d => Err(PipelineError::DeadlineExceeded {
            completed_chunks: index,
            total_chunks: total,
        }),
        _ => Ok(()),
    }
}
