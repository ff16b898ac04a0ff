//! Process-wide synthesis backend handle
//!
//! The backend is loaded at most once, on first use or via [`SynthesisHandle::warm_up`].
//! Concurrent first calls race safely: one runs the factory, the others wait
//! for it. A failed load leaves the handle empty so a later call retries.

use futures::future::BoxFuture;
use std::future::Future;
use std::time::Instant;
use tokio::sync::{Mutex, OnceCell};

use super::{SpeechSynthesizer, SynthesisFailure};
use tts_gateway_core::{GenerationParams, RawWaveform};

/// Builds the backend on first use
pub type SynthesizerFactory = Box<
    dyn Fn() -> BoxFuture<'static, Result<Box<dyn SpeechSynthesizer>, SynthesisFailure>>
        + Send
        + Sync,
>;

struct LoadedSynthesizer {
    backend: Mutex<Box<dyn SpeechSynthesizer>>,
    sample_rate: u32,
    builtin_voice: bool,
    name: String,
}

impl LoadedSynthesizer {
    fn new(backend: Box<dyn SpeechSynthesizer>) -> Self {
        Self {
            sample_rate: backend.sample_rate(),
            builtin_voice: backend.has_builtin_voice(),
            name: backend.name().to_string(),
            backend: Mutex::new(backend),
        }
    }
}

/// Lazily initialised, exclusively borrowed synthesis backend
pub struct SynthesisHandle {
    factory: SynthesizerFactory,
    loaded: OnceCell<LoadedSynthesizer>,
}

impl SynthesisHandle {
    /// Create a handle that loads its backend with `factory`
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Box<dyn SpeechSynthesizer>, SynthesisFailure>> + Send + 'static,
    {
        Self {
            factory: Box::new(move || Box::pin(factory())),
            loaded: OnceCell::new(),
        }
    }

    /// Create a handle around an already constructed backend
    pub fn from_backend(backend: Box<dyn SpeechSynthesizer>) -> Self {
        Self {
            factory: Box::new(|| {
                Box::pin(async {
                    Err(SynthesisFailure::Unavailable(
                        "backend was supplied pre-loaded".to_string(),
                    ))
                })
            }),
            loaded: OnceCell::new_with(Some(LoadedSynthesizer::new(backend))),
        }
    }

    async fn loaded(&self) -> Result<&LoadedSynthesizer, SynthesisFailure> {
        self.loaded
            .get_or_try_init(|| async {
                let start = Instant::now();
                let backend = (self.factory)().await?;
                tracing::info!(
                    backend = backend.name(),
                    sample_rate = backend.sample_rate(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Synthesis backend loaded"
                );
                Ok(LoadedSynthesizer::new(backend))
            })
            .await
    }

    /// Load the backend now instead of on first request
    pub async fn warm_up(&self) -> Result<(), SynthesisFailure> {
        self.loaded().await.map(|_| ())
    }

    /// Has the backend been loaded?
    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    /// Backend sample rate, loading it if needed
    pub async fn sample_rate(&self) -> Result<u32, SynthesisFailure> {
        Ok(self.loaded().await?.sample_rate)
    }

    /// Can the backend synthesize without a voice prompt?
    pub async fn has_builtin_voice(&self) -> Result<bool, SynthesisFailure> {
        Ok(self.loaded().await?.builtin_voice)
    }

    /// Backend name, if loaded
    pub fn backend_name(&self) -> Option<&str> {
        self.loaded.get().map(|l| l.name.as_str())
    }

    /// Synthesize one chunk, holding the backend exclusively for the call
    pub async fn synthesize(
        &self,
        text: &str,
        params: &GenerationParams,
    ) -> Result<RawWaveform, SynthesisFailure> {
        let loaded = self.loaded().await?;
        let mut backend = loaded.backend.lock().await;
        backend.synthesize(text, params).await
    }
}

impl std::fmt::Debug for SynthesisHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisHandle")
            .field("loaded", &self.is_loaded())
            .field("backend", &self.backend_name())
            .finish()
    }
}
