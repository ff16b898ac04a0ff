//! Streaming synthesis
//!
//! Emits each chunk's audio as soon as it is synthesized. A producer task
//! owns the chunk loop and hands events over a channel of capacity one, so
//! it never runs more than one chunk ahead of the consumer. Dropping the
//! stream stops the producer before its next synthesis call; a chunk already
//! in flight is allowed to finish.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_stream::Stream;

use crate::orchestrator::{check_deadline, ChunkedSynthesisOrchestrator};
use crate::PipelineError;
use tts_gateway_core::{AudioEncoding, GenerationParams};

/// Event emitted by a synthesis stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Audio for one chunk
    Chunk {
        /// 0-based chunk index
        seq: usize,
        /// Encoded audio bytes
        audio: Vec<u8>,
        format: AudioEncoding,
        sample_rate: u32,
    },
    /// All chunks delivered
    Complete {
        total_chunks: usize,
        elapsed_seconds: f64,
    },
    /// Synthesis stopped
    Error { message: String },
}

impl StreamEvent {
    /// Does this event end the stream?
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Chunk { .. })
    }
}

/// Single-pass stream of [`StreamEvent`]s
pub struct SynthesisStream {
    rx: mpsc::Receiver<StreamEvent>,
    complete: bool,
}

impl SynthesisStream {
    fn new(rx: mpsc::Receiver<StreamEvent>) -> Self {
        Self { rx, complete: false }
    }

    /// Stream holding exactly one event
    fn single(event: StreamEvent) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.try_send(event);
        Self::new(rx)
    }

    /// Get next event
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        if self.complete {
            return None;
        }

        match self.rx.recv().await {
            Some(event) => {
                if event.is_terminal() {
                    self.complete = true;
                }
                Some(event)
            }
            None => {
                self.complete = true;
                None
            }
        }
    }

    /// Has the terminal event been delivered?
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

impl Stream for SynthesisStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.complete {
            return Poll::Ready(None);
        }

        match Pin::new(&mut self.rx).poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                if event.is_terminal() {
                    self.complete = true;
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                self.complete = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Wraps the orchestrator to deliver audio chunk by chunk
#[derive(Debug, Clone)]
pub struct StreamingChannelAdapter {
    orchestrator: ChunkedSynthesisOrchestrator,
}

impl StreamingChannelAdapter {
    pub fn new(orchestrator: ChunkedSynthesisOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Start streaming `text`. An unknown `format` yields a single error
    /// event and no synthesis work.
    ///
    /// Must be called within a tokio runtime.
    pub fn stream(
        &self,
        text: impl Into<String>,
        params: GenerationParams,
        format: &str,
    ) -> SynthesisStream {
        let encoding = match format.parse::<AudioEncoding>() {
            Ok(encoding) => encoding,
            Err(e) => {
                tracing::warn!(format, "Rejecting stream with unsupported format");
                return SynthesisStream::single(StreamEvent::Error {
                    message: PipelineError::from(e).to_string(),
                });
            }
        };

        let (tx, rx) = mpsc::channel(1);
        let orchestrator = self.orchestrator.clone();
        let text = text.into();

        tokio::spawn(async move {
            produce(orchestrator, text, params, encoding, tx).await;
        });

        SynthesisStream::new(rx)
    }
}

async fn produce(
    orchestrator: ChunkedSynthesisOrchestrator,
    text: String,
    params: GenerationParams,
    encoding: AudioEncoding,
    tx: mpsc::Sender<StreamEvent>,
) {
    let start = Instant::now();

    if let Err(e) = orchestrator.require_voice(&params).await {
        let _ = tx.send(StreamEvent::Error { message: e.to_string() }).await;
        return;
    }

    let chunks = orchestrator.segment(&text);
    let deadline = orchestrator.deadline(start);

    tracing::info!(
        chunks = chunks.len(),
        chars = text.chars().count(),
        format = %encoding,
        "Starting streaming synthesis"
    );

    for chunk in &chunks {
        if tx.is_closed() {
            tracing::info!(
                chunk = chunk.index,
                total = chunks.len(),
                "Stream consumer gone, stopping before next chunk"
            );
            return;
        }

        if let Err(e) = check_deadline(deadline, chunk.index, chunks.len()) {
            tracing::warn!(chunk = chunk.index, "Stream deadline exceeded");
            let _ = tx.send(StreamEvent::Error { message: e.to_string() }).await;
            return;
        }

        let segment = match orchestrator.synthesize_chunk(chunk, &params).await {
            Ok(segment) => segment,
            Err(e) => {
                let _ = tx.send(StreamEvent::Error { message: e.to_string() }).await;
                return;
            }
        };

        let event = StreamEvent::Chunk {
            seq: chunk.index,
            audio: encoding.encode(&segment.samples),
            format: encoding,
            sample_rate: segment.sample_rate,
        };

        if tx.send(event).await.is_err() {
            tracing::info!(chunk = chunk.index, "Stream consumer gone after chunk");
            return;
        }
    }

    let elapsed_seconds = start.elapsed().as_secs_f64();
    tracing::info!(
        chunks = chunks.len(),
        elapsed_ms = (elapsed_seconds * 1000.0) as u64,
        "Streaming synthesis complete"
    );

    let _ = tx
        .send(StreamEvent::Complete {
            total_chunks: chunks.len(),
            elapsed_seconds,
        })
        .await;
}
