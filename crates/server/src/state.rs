//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;
use std::time::Duration;

use tts_gateway_config::{Settings, SynthesisBackend, SynthesisConfig};
use tts_gateway_pipeline::{
    ChunkedSynthesisOrchestrator, OrchestratorConfig, RemoteSynthesizer, SpeechSynthesizer,
    StubSynthesizer, SynthesisFailure, SynthesisHandle,
};

use crate::storage::{AudioPublisher, OutputStore, StaticUrlPublisher};
use crate::voice_prompt::VoicePromptResolver;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<Settings>,
    /// Chunked synthesis over the shared backend
    pub orchestrator: ChunkedSynthesisOrchestrator,
    /// Voice prompt lookup
    pub voice_prompts: Arc<VoicePromptResolver>,
    /// Batch output directory
    pub output: Arc<OutputStore>,
    /// URL publisher for batch output
    pub publisher: Option<Arc<dyn AudioPublisher>>,
}

impl AppState {
    /// Create new application state around a synthesis handle
    pub fn new(config: Settings, handle: Arc<SynthesisHandle>) -> Self {
        let orchestrator = ChunkedSynthesisOrchestrator::new(
            handle,
            OrchestratorConfig {
                max_chunk_chars: config.synthesis.max_chunk_chars,
                request_timeout: config.synthesis.request_timeout_seconds.map(Duration::from_secs),
            },
        );

        let publisher = config
            .output
            .public_base_url
            .as_ref()
            .map(|url| Arc::new(StaticUrlPublisher::new(url.clone())) as Arc<dyn AudioPublisher>);

        Self {
            voice_prompts: Arc::new(VoicePromptResolver::new(&config.voice_prompts)),
            output: Arc::new(OutputStore::new(&config.output)),
            publisher,
            orchestrator,
            config: Arc::new(config),
        }
    }
}

/// Build the process-wide synthesis handle for the configured backend.
///
/// Nothing is loaded here; the backend comes up on warm-up or first use.
pub fn build_synthesis_handle(config: &SynthesisConfig) -> SynthesisHandle {
    match config.backend {
        SynthesisBackend::Stub => {
            let sample_rate = config.stub_sample_rate;
            SynthesisHandle::new(move || async move {
                Ok::<_, SynthesisFailure>(Box::new(StubSynthesizer::new(sample_rate)) as Box<dyn SpeechSynthesizer>)
            })
        }
        SynthesisBackend::Remote => {
            let url = config.remote.url.clone();
            let timeout = Duration::from_secs(config.remote.timeout_seconds);
            let force_builtin_voice = config.remote.builtin_voice;
            SynthesisHandle::new(move || {
                let url = url.clone();
                async move {
                    let mut backend = RemoteSynthesizer::connect(&url, timeout).await?;
                    if force_builtin_voice {
                        backend = backend.with_builtin_voice(true);
                    }
                    Ok::<_, SynthesisFailure>(Box::new(backend) as Box<dyn SpeechSynthesizer>)
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_handle_loads_lazily() {
        let config = SynthesisConfig {
            stub_sample_rate: 16000,
            ..Default::default()
        };
        let handle = build_synthesis_handle(&config);
        assert!(!handle.is_loaded());

        handle.warm_up().await.unwrap();
        assert!(handle.is_loaded());
        assert_eq!(handle.sample_rate().await.unwrap(), 16000);
        assert_eq!(handle.backend_name(), Some("stub"));
    }

    #[tokio::test]
    async fn test_remote_handle_unreachable() {
        let mut config = SynthesisConfig::default();
        config.backend = SynthesisBackend::Remote;
        config.remote.url = "http://127.0.0.1:1".to_string();
        config.remote.timeout_seconds = 1;

        let handle = build_synthesis_handle(&config);
        assert!(handle.warm_up().await.is_err());
        assert!(!handle.is_loaded());
    }

    #[test]
    fn test_publisher_from_config() {
        let mut settings = Settings::default();
        let handle = Arc::new(build_synthesis_handle(&settings.synthesis));
        assert!(AppState::new(settings.clone(), handle.clone()).publisher.is_none());

        settings.output.public_base_url = Some("https://cdn.example.com".to_string());
        assert!(AppState::new(settings, handle).publisher.is_some());
    }
}
