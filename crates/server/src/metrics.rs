//! Observability Metrics
//!
//! Prometheus metrics endpoint for monitoring.

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use crate::ServerError;

/// Global Prometheus handle
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize metrics recorder
///
/// Must be called once at startup before recording any metrics.
pub fn init_metrics() -> Result<PrometheusHandle, ServerError> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Internal(format!("Failed to install Prometheus recorder: {}", e)))?;

    register_default_metrics();

    METRICS_HANDLE.get_or_init(|| handle.clone());
    Ok(handle)
}

/// Get the global metrics handle
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

fn register_default_metrics() {
    counter!("tts_gateway_requests_total", "mode" => "batch").absolute(0);
    counter!("tts_gateway_requests_total", "mode" => "stream").absolute(0);
    counter!("tts_gateway_requests_total", "mode" => "ws").absolute(0);

    counter!("tts_gateway_chunks_synthesized_total").absolute(0);

    counter!("tts_gateway_errors_total", "type" => "validation").absolute(0);
    counter!("tts_gateway_errors_total", "type" => "synthesis").absolute(0);
}

/// Record request by mode (`batch`, `stream`, `ws`)
pub fn record_request(mode: &'static str) {
    counter!("tts_gateway_requests_total", "mode" => mode).increment(1);
}

/// Record end-to-end request latency
pub fn record_request_latency(mode: &'static str, duration_secs: f64) {
    histogram!("tts_gateway_request_seconds", "mode" => mode).record(duration_secs);
}

/// Record the length of produced audio
pub fn record_audio_duration(duration_secs: f64) {
    histogram!("tts_gateway_audio_seconds").record(duration_secs);
}

/// Record error by type
pub fn record_error(error_type: &'static str) {
    counter!("tts_gateway_errors_total", "type" => error_type).increment(1);
}

/// Metrics endpoint handler
///
/// Returns Prometheus-formatted metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    match get_metrics_handle() {
        Some(handle) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            handle.render(),
        ),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_helpers() {
        // No recorder installed; these should not panic
        record_request("batch");
        record_request_latency("stream", 0.4);
        record_audio_duration(12.5);
        record_error("synthesis");
    }
}
