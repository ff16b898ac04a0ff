//! HTTP Endpoints
//!
//! REST API for the TTS gateway.

use std::time::Instant;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tts_gateway_core::AudioEncoding;

use crate::messages::{BatchResponse, StreamMessage};
use crate::metrics::{self, metrics_handler};
use crate::request::{Job, JobInput};
use crate::state::AppState;
use crate::storage::encode_wav;
use crate::websocket::WebSocketHandler;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state);

    Router::new()
        // Synthesis
        .route("/api/tts", post(synthesize))
        .route("/ws/tts", get(WebSocketHandler::handle))

        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))

        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let server = &state.config.server;
    if !server.cors_enabled {
        return CorsLayer::new();
    }

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if server.cors_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// Synthesis endpoint: one WAV file, or NDJSON chunks when `stream` is set
async fn synthesize(
    State(state): State<AppState>,
    payload: Result<Json<JobInput>, JsonRejection>,
) -> Response {
    let result = match payload {
        Ok(Json(input)) => input
            .into_job(&state.config, &state.voice_prompts)
            .map_err(ServerError::from),
        Err(rejection) => Err(ServerError::InvalidRequest(rejection.body_text())),
    };

    let job = match result {
        Ok(job) => job,
        Err(e) => {
            metrics::record_error(e.error_type());
            return e.into_response();
        }
    };

    if job.stream {
        return stream_response(state, job);
    }

    match run_batch(&state, job).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            metrics::record_error(e.error_type());
            e.into_response()
        }
    }
}

/// Synthesize, store and publish a whole request
pub async fn run_batch(state: &AppState, job: Job) -> Result<BatchResponse, ServerError> {
    metrics::record_request("batch");
    let start = Instant::now();

    let audio = state.orchestrator.orchestrate(&job.text, &job.params).await?;
    let wav = encode_wav(&audio)?;
    let stored = state.output.save(&job.session_id, &wav).await?;

    let url = match &state.publisher {
        Some(publisher) => match publisher.publish(&stored, &wav).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "Publishing failed; returning audio inline");
                None
            }
        },
        None => None,
    };

    let elapsed = start.elapsed().as_secs_f64();
    metrics::record_request_latency("batch", elapsed);
    metrics::record_audio_duration(audio.duration_seconds);

    tracing::info!(
        session_id = %job.session_id,
        duration_sec = audio.duration_seconds,
        elapsed_sec = elapsed,
        file = %stored.filename,
        "Batch synthesis complete"
    );

    Ok(match url {
        Some(url) => BatchResponse::with_url(audio.sample_rate, audio.duration_seconds, url),
        None => BatchResponse::with_inline(audio.sample_rate, audio.duration_seconds, &wav),
    })
}

/// Stream chunks as newline-delimited JSON. Dropping the response body
/// (client disconnect) stops synthesis.
fn stream_response(state: AppState, job: Job) -> Response {
    metrics::record_request("stream");
    let start = Instant::now();

    let encoding = job.output_format.parse().unwrap_or(AudioEncoding::Pcm16);
    let events = state
        .orchestrator
        .stream(job.text, job.params, &job.output_format);

    let lines = events.map(move |event| {
        let msg = StreamMessage::from_event(event, encoding);
        match &msg {
            StreamMessage::Error(_) => metrics::record_error("synthesis"),
            m if m.is_terminal() => {
                metrics::record_request_latency("stream", start.elapsed().as_secs_f64())
            }
            _ => {}
        }

        let mut line = msg.to_json();
        line.push('\n');
        Ok::<_, std::convert::Infallible>(line)
    });

    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response()
}

/// Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check: ready once the synthesis backend is loaded
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let handle = state.orchestrator.handle();
    let loaded = handle.is_loaded();
    let (status, label) = if loaded {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "loading")
    };

    (
        status,
        Json(serde_json::json!({
            "status": label,
            "backend": handle.backend_name(),
            "max_chunk_chars": state.orchestrator.max_chunk_chars(),
        })),
    )
}
