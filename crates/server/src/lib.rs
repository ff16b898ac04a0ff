//! TTS Gateway Server
//!
//! Provides HTTP and WebSocket endpoints for long-form speech synthesis.

pub mod http;
pub mod messages;
pub mod metrics;
pub mod request;
pub mod state;
pub mod storage;
pub mod voice_prompt;
pub mod websocket;

pub use http::create_router;
pub use messages::{BatchResponse, ErrorResponse, StreamMessage};
pub use crate::metrics::init_metrics;
pub use request::{Job, JobInput};
pub use state::{build_synthesis_handle, AppState};
pub use storage::{encode_wav, AudioPublisher, OutputStore, StaticUrlPublisher, StoredAudio};
pub use voice_prompt::VoicePromptResolver;
pub use websocket::WebSocketHandler;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tts_gateway_core::{ValidationError, VoicePromptError};
use tts_gateway_pipeline::PipelineError;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    VoicePrompt(#[from] VoicePromptError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Validation(_)
            | ServerError::VoicePrompt(_)
            | ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(e) => match e {
                PipelineError::Validation(_)
                | PipelineError::VoicePrompt(_)
                | PipelineError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
                PipelineError::Backend(_) => StatusCode::SERVICE_UNAVAILABLE,
                PipelineError::DeadlineExceeded { .. } => StatusCode::GATEWAY_TIMEOUT,
                PipelineError::Synthesis { .. } | PipelineError::Audio(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ServerError::Storage(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for metrics
    pub fn error_type(&self) -> &'static str {
        match self {
            ServerError::Validation(_) | ServerError::InvalidRequest(_) => "validation",
            ServerError::VoicePrompt(_) => "voice_prompt",
            ServerError::Pipeline(e) => e.error_type(),
            ServerError::Storage(_) => "storage",
            ServerError::Internal(_) => "internal",
        }
    }
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        err.status_code()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}
