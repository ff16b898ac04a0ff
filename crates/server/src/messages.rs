//! Wire messages
//!
//! JSON shapes returned by the batch endpoint and emitted by the stream
//! endpoints (one message per NDJSON line or WebSocket text frame).

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

use tts_gateway_core::AudioEncoding;
use tts_gateway_pipeline::StreamEvent;

/// Successful batch result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchResponse {
    /// Always `"success"`
    pub status: String,
    pub sample_rate: u32,
    pub duration_sec: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
}

impl BatchResponse {
    pub fn with_url(sample_rate: u32, duration_sec: f64, url: String) -> Self {
        Self {
            status: "success".to_string(),
            sample_rate,
            duration_sec,
            audio_url: Some(url),
            audio_base64: None,
        }
    }

    pub fn with_inline(sample_rate: u32, duration_sec: f64, audio: &[u8]) -> Self {
        Self {
            status: "success".to_string(),
            sample_rate,
            duration_sec,
            audio_url: None,
            audio_base64: Some(BASE64.encode(audio)),
        }
    }
}

/// Error body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Progress message on a synthesis stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProgressMessage {
    /// One chunk of audio
    Streaming {
        chunk: usize,
        format: AudioEncoding,
        /// Base64 of the encoded chunk
        audio_chunk: String,
        sample_rate: u32,
    },
    /// All chunks sent
    Complete {
        format: AudioEncoding,
        total_chunks: usize,
        elapsed_time_seconds: f64,
    },
}

/// Any message on a synthesis stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StreamMessage {
    Progress(ProgressMessage),
    Error(ErrorResponse),
}

impl StreamMessage {
    /// Map a pipeline event to its wire form. `format` labels the
    /// completion message.
    pub fn from_event(event: StreamEvent, format: AudioEncoding) -> Self {
        match event {
            StreamEvent::Chunk {
                seq,
                audio,
                format,
                sample_rate,
            } => StreamMessage::Progress(ProgressMessage::Streaming {
                chunk: seq,
                format,
                audio_chunk: BASE64.encode(&audio),
                sample_rate,
            }),
            StreamEvent::Complete {
                total_chunks,
                elapsed_seconds,
            } => StreamMessage::Progress(ProgressMessage::Complete {
                format,
                total_chunks,
                elapsed_time_seconds: elapsed_seconds,
            }),
            StreamEvent::Error { message } => StreamMessage::Error(ErrorResponse::new(message)),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamMessage::Error(ErrorResponse::new(message))
    }

    /// Does this message end the stream?
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            StreamMessage::Progress(ProgressMessage::Streaming { .. })
        )
    }

    /// Serialize to a JSON string
    pub fn to_json(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => format!("{{\"error\":\"serialization failed: {}\"}}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_streaming_shape() {
        let msg = StreamMessage::from_event(
            StreamEvent::Chunk {
                seq: 3,
                audio: vec![1, 2, 3],
                format: AudioEncoding::Pcm16,
                sample_rate: 24000,
            },
            AudioEncoding::Pcm16,
        );
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "status": "streaming",
                "chunk": 3,
                "format": "pcm_16",
                "audio_chunk": "AQID",
                "sample_rate": 24000
            })
        );
        assert!(!msg.is_terminal());
    }

    #[test]
    fn test_complete_shape() {
        let msg = StreamMessage::from_event(
            StreamEvent::Complete {
                total_chunks: 2,
                elapsed_seconds: 1.5,
            },
            AudioEncoding::Pcm16,
        );
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "status": "complete",
                "format": "pcm_16",
                "total_chunks": 2,
                "elapsed_time_seconds": 1.5
            })
        );
        assert!(msg.is_terminal());
    }

    #[test]
    fn test_error_shape() {
        let msg = StreamMessage::from_event(
            StreamEvent::Error {
                message: "boom".to_string(),
            },
            AudioEncoding::Pcm16,
        );
        assert_eq!(msg.to_json(), r#"{"error":"boom"}"#);
        assert!(msg.is_terminal());
    }

    #[test]
    fn test_batch_shape() {
        let inline = BatchResponse::with_inline(24000, 2.0, b"RIFF");
        assert_eq!(
            serde_json::to_value(&inline).unwrap(),
            json!({
                "status": "success",
                "sample_rate": 24000,
                "duration_sec": 2.0,
                "audio_base64": "UklGRg=="
            })
        );

        let url = BatchResponse::with_url(24000, 2.0, "https://cdn/x.wav".to_string());
        let value = serde_json::to_value(&url).unwrap();
        assert_eq!(value["audio_url"], "https://cdn/x.wav");
        assert!(value.get("audio_base64").is_none());
    }

    #[test]
    fn test_messages_parse_back() {
        let msg: StreamMessage = serde_json::from_str(r#"{"error":"nope"}"#).unwrap();
        assert_eq!(msg, StreamMessage::error("nope"));
    }
}
