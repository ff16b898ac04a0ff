//! End-to-end tests for the HTTP API
//!
//! Requests go through the full router with `tower::ServiceExt::oneshot`,
//! backed by the stub synthesizer or small fakes.

use std::io::Cursor;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use tts_gateway_config::Settings;
use tts_gateway_core::{GenerationParams, RawWaveform};
use tts_gateway_pipeline::{SpeechSynthesizer, StubSynthesizer, SynthesisFailure, SynthesisHandle};
use tts_gateway_server::{build_synthesis_handle, create_router, AppState};

/// 24 kHz stub: 1200 samples per character
const SAMPLES_PER_CHAR: usize = 1200;

struct TestApp {
    router: Router,
    settings: Settings,
    _dirs: (TempDir, TempDir),
}

fn settings() -> (Settings, TempDir, TempDir) {
    let output = TempDir::new().unwrap();
    let prompts = TempDir::new().unwrap();

    let mut settings = Settings::default();
    settings.output.directory = output.path().to_path_buf();
    settings.voice_prompts.directory = prompts.path().to_path_buf();
    settings.synthesis.max_chunk_chars = 20;
    (settings, output, prompts)
}

fn app_with(settings: Settings, backend: Box<dyn SpeechSynthesizer>, dirs: (TempDir, TempDir)) -> TestApp {
    let handle = Arc::new(SynthesisHandle::from_backend(backend));
    TestApp {
        router: create_router(AppState::new(settings.clone(), handle)),
        settings,
        _dirs: dirs,
    }
}

fn stub_app() -> TestApp {
    let (settings, output, prompts) = settings();
    app_with(settings, Box::new(StubSynthesizer::default()), (output, prompts))
}

async fn post_tts(app: &TestApp, body: Value) -> (StatusCode, Vec<u8>) {
    post_raw(app, body.to_string()).await
}

async fn post_raw(app: &TestApp, body: String) -> (StatusCode, Vec<u8>) {
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/tts")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn get(app: &TestApp, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

fn ndjson(bytes: &[u8]) -> Vec<Value> {
    std::str::from_utf8(bytes)
        .unwrap()
        .lines()
        .filter(|l| !l.is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

/// Fails on the given call; no built-in voice when `builtin_voice` is false
struct FlakySynthesizer {
    calls: usize,
    fail_on_call: Option<usize>,
    builtin_voice: bool,
}

#[async_trait::async_trait]
impl SpeechSynthesizer for FlakySynthesizer {
    async fn synthesize(
        &mut self,
        text: &str,
        _params: &GenerationParams,
    ) -> Result<RawWaveform, SynthesisFailure> {
        let call = self.calls;
        self.calls += 1;
        if Some(call) == self.fail_on_call {
            return Err(SynthesisFailure::Backend("CUDA out of memory".to_string()));
        }
        Ok(RawWaveform::mono(vec![0.1f32; text.len()], 16000))
    }

    fn sample_rate(&self) -> u32 {
        16000
    }

    fn has_builtin_voice(&self) -> bool {
        self.builtin_voice
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

#[tokio::test]
async fn test_health() {
    let app = stub_app();
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["status"], "healthy");
}

#[tokio::test]
async fn test_batch_returns_inline_wav() {
    let app = stub_app();
    let text = "Hello world.";

    let (status, body) = post_tts(&app, json!({ "text": text, "session_id": "s1" })).await;
    assert_eq!(status, StatusCode::OK);

    let body = json_body(&body);
    assert_eq!(body["status"], "success");
    assert_eq!(body["sample_rate"], 24000);
    assert!(body.get("audio_url").is_none());

    let expected_samples = text.len() * SAMPLES_PER_CHAR;
    let duration = body["duration_sec"].as_f64().unwrap();
    assert!((duration - expected_samples as f64 / 24000.0).abs() < 1e-9);

    let wav = BASE64.decode(body["audio_base64"].as_str().unwrap()).unwrap();
    let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
    assert_eq!(reader.spec().sample_rate, 24000);
    assert_eq!(reader.duration() as usize, expected_samples);

    // Persisted under the session id
    let saved: Vec<String> = std::fs::read_dir(&app.settings.output.directory)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(saved.len(), 1);
    assert!(saved[0].starts_with("s1_"));
}

#[tokio::test]
async fn test_batch_long_text_concatenates_chunks() {
    let app = stub_app();
    let text = "First sentence. Second sentence. Third sentence.";

    let (status, body) = post_tts(&app, json!({ "text": text })).await;
    assert_eq!(status, StatusCode::OK);

    // Whitespace between sentences is not synthesized
    let spoken = "First sentence.".len() + "Second sentence.".len() + "Third sentence.".len();
    let wav = BASE64
        .decode(json_body(&body)["audio_base64"].as_str().unwrap())
        .unwrap();
    let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
    assert_eq!(reader.duration() as usize, spoken * SAMPLES_PER_CHAR);
}

#[tokio::test]
async fn test_batch_with_public_url() {
    let (mut settings, output, prompts) = settings();
    settings.output.public_base_url = Some("https://cdn.example.com/tts".to_string());
    let app = app_with(settings, Box::new(StubSynthesizer::default()), (output, prompts));

    let (status, body) = post_tts(&app, json!({ "text": "Hi.", "session_id": "abc" })).await;
    assert_eq!(status, StatusCode::OK);

    let body = json_body(&body);
    let url = body["audio_url"].as_str().unwrap();
    assert!(url.starts_with("https://cdn.example.com/tts/abc_"));
    assert!(url.ends_with(".wav"));
    assert!(body.get("audio_base64").is_none());
}

#[tokio::test]
async fn test_missing_text() {
    let app = stub_app();
    let (status, body) = post_tts(&app, json!({ "temperature": 0.5 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body), json!({ "error": "Missing 'text' parameter" }));
}

#[tokio::test]
async fn test_text_too_long() {
    let app = stub_app();
    let text = "a".repeat(app.settings.limits.max_text_length + 1);
    let (status, body) = post_tts(&app, json!({ "text": text })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let error = json_body(&body)["error"].as_str().unwrap().to_string();
    assert!(error.starts_with("Text length exceeds maximum of 2000"), "{}", error);
}

#[tokio::test]
async fn test_parameter_out_of_range() {
    let app = stub_app();
    let (status, body) = post_tts(&app, json!({ "text": "Hi.", "temperature": 3.0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let error = json_body(&body)["error"].as_str().unwrap().to_string();
    assert!(error.starts_with("temperature must be between 0.05 and 2"), "{}", error);
}

#[tokio::test]
async fn test_voice_prompt_traversal_rejected() {
    let app = stub_app();
    let (status, body) =
        post_tts(&app, json!({ "text": "Hi.", "audio_prompt": "../../etc/passwd" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_body(&body)["error"]
        .as_str()
        .unwrap()
        .contains("path traversal"));
}

#[tokio::test]
async fn test_voice_prompt_not_found() {
    let app = stub_app();
    let (status, body) = post_tts(&app, json!({ "text": "Hi.", "audio_prompt": "nope.wav" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(&body),
        json!({ "error": "Audio prompt not found: nope.wav" })
    );
}

#[tokio::test]
async fn test_malformed_body() {
    let app = stub_app();
    let (status, body) = post_raw(&app, "{not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_body(&body)["error"].is_string());
}

#[tokio::test]
async fn test_voice_required_without_builtin() {
    let (settings, output, prompts) = settings();
    let backend = FlakySynthesizer {
        calls: 0,
        fail_on_call: None,
        builtin_voice: false,
    };
    let app = app_with(settings, Box::new(backend), (output, prompts));

    let (status, body) = post_tts(&app, json!({ "text": "Hi." })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_body(&body)["error"]
        .as_str()
        .unwrap()
        .contains("audio_prompt"));
}

#[tokio::test]
async fn test_batch_chunk_failure_returns_no_audio() {
    let (settings, output, prompts) = settings();
    let backend = FlakySynthesizer {
        calls: 0,
        fail_on_call: Some(1),
        builtin_voice: true,
    };
    let app = app_with(settings, Box::new(backend), (output, prompts));

    let (status, body) = post_tts(
        &app,
        json!({ "text": "First sentence. Second sentence. Third sentence." }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let body = json_body(&body);
    assert_eq!(body.as_object().unwrap().len(), 1);
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("chunk 1"), "{}", error);
    assert!(error.contains("CUDA out of memory"));

    // Nothing persisted
    assert!(std::fs::read_dir(&app.settings.output.directory)
        .map(|mut d| d.next().is_none())
        .unwrap_or(true));
}

#[tokio::test]
async fn test_stream_ndjson() {
    let app = stub_app();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/tts")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "text": "First sentence. Second sentence. Third sentence.",
                        "stream": true
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/x-ndjson"
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let lines = ndjson(&bytes);
    assert_eq!(lines.len(), 4);

    let lengths = ["First sentence.", "Second sentence.", "Third sentence."].map(str::len);
    for (i, line) in lines[..3].iter().enumerate() {
        assert_eq!(line["status"], "streaming");
        assert_eq!(line["chunk"], i);
        assert_eq!(line["format"], "pcm_16");
        assert_eq!(line["sample_rate"], 24000);

        let pcm = BASE64.decode(line["audio_chunk"].as_str().unwrap()).unwrap();
        assert_eq!(pcm.len(), lengths[i] * SAMPLES_PER_CHAR * 2);
    }

    let complete = &lines[3];
    assert_eq!(complete["status"], "complete");
    assert_eq!(complete["total_chunks"], 3);
    assert!(complete["elapsed_time_seconds"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_stream_unknown_format() {
    let app = stub_app();
    let (status, body) = post_tts(
        &app,
        json!({ "text": "Hi there.", "stream": true, "output_format": "mp3" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let lines = ndjson(&body);
    assert_eq!(lines.len(), 1);
    assert!(lines[0]["error"].as_str().unwrap().contains("mp3"));
}

#[tokio::test]
async fn test_stream_chunk_failure() {
    let (settings, output, prompts) = settings();
    let backend = FlakySynthesizer {
        calls: 0,
        fail_on_call: Some(1),
        builtin_voice: true,
    };
    let app = app_with(settings, Box::new(backend), (output, prompts));

    let (_, body) = post_tts(
        &app,
        json!({
            "text": "First sentence. Second sentence. Third sentence.",
            "stream": true
        }),
    )
    .await;

    let lines = ndjson(&body);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["status"], "streaming");
    assert_eq!(lines[0]["chunk"], 0);
    assert!(lines[1]["error"].as_str().unwrap().contains("chunk 1"));
}

#[tokio::test]
async fn test_readiness_follows_backend_load() {
    let (settings, output, prompts) = settings();
    let handle = Arc::new(build_synthesis_handle(&settings.synthesis));
    let app = TestApp {
        router: create_router(AppState::new(settings.clone(), handle.clone())),
        settings,
        _dirs: (output, prompts),
    };

    let (status, body) = get(&app, "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(&body)["status"], "loading");

    handle.warm_up().await.unwrap();

    let (status, body) = get(&app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["backend"], "stub");
}

#[tokio::test]
async fn test_first_request_loads_backend() {
    let (settings, output, prompts) = settings();
    let handle = Arc::new(build_synthesis_handle(&settings.synthesis));
    let app = TestApp {
        router: create_router(AppState::new(settings.clone(), handle.clone())),
        settings,
        _dirs: (output, prompts),
    };

    assert!(!handle.is_loaded());
    let (status, _) = post_tts(&app, json!({ "text": "Hi." })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(handle.is_loaded());
}
