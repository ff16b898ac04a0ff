//! Remote synthesis backend
//!
//! Talks to a model-serving sidecar over HTTP. The sidecar owns the model;
//! this side only coerces its output into a [`RawWaveform`].
//!
//! Protocol:
//! - `GET {url}/health` returns `{"sample_rate": 24000, "builtin_voice": false}`
//! - `POST {url}/synthesize` takes the text plus generation parameters and
//!   returns `{"sample_rate": 24000, "dtype": "float32", "samples": [...]}` where
//!   `samples` is either flat or a 2-D array in either axis order.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{SpeechSynthesizer, SynthesisFailure};
use tts_gateway_core::{GenerationParams, RawWaveform, SampleBuffer, WaveShape};

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    exaggeration: f32,
    cfg_weight: f32,
    temperature: f32,
    repetition_penalty: f32,
    min_p: f32,
    top_p: f32,
    top_k: u32,
    norm_loudness: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_prompt_path: Option<String>,
}

impl<'a> SynthesizeRequest<'a> {
    fn new(text: &'a str, params: &GenerationParams) -> Self {
        Self {
            text,
            exaggeration: params.exaggeration,
            cfg_weight: params.cfg_weight,
            temperature: params.temperature,
            repetition_penalty: params.repetition_penalty,
            min_p: params.min_p,
            top_p: params.top_p,
            top_k: params.top_k,
            norm_loudness: params.normalize_loudness,
            audio_prompt_path: params
                .voice_prompt
                .as_ref()
                .map(|p| p.path().to_string_lossy().into_owned()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SampleArray {
    Flat(Vec<f64>),
    Matrix(Vec<Vec<f64>>),
}

#[derive(Debug, Deserialize)]
struct SynthesizeResponse {
    sample_rate: u32,
    #[serde(default)]
    dtype: Option<String>,
    samples: SampleArray,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    sample_rate: u32,
    #[serde(default)]
    builtin_voice: bool,
}

impl SynthesizeResponse {
    fn into_waveform(self) -> Result<RawWaveform, SynthesisFailure> {
        let single = matches!(self.dtype.as_deref(), Some("float32") | Some("f32"));

        let (values, shape) = match self.samples {
            SampleArray::Flat(v) => (v, WaveShape::Flat),
            SampleArray::Matrix(rows) => {
                let cols = rows.first().map_or(0, Vec::len);
                if rows.iter().any(|r| r.len() != cols) {
                    return Err(SynthesisFailure::Backend(
                        "ragged sample matrix in response".to_string(),
                    ));
                }
                let n_rows = rows.len();
                let flat = rows.into_iter().flatten().collect();
                (flat, WaveShape::Matrix { rows: n_rows, cols })
            }
        };

        let samples = if single {
            SampleBuffer::F32(values.into_iter().map(|s| s as f32).collect())
        } else {
            SampleBuffer::F64(values)
        };

        Ok(RawWaveform {
            samples,
            shape,
            sample_rate: self.sample_rate,
        })
    }
}

/// HTTP client for a model-serving sidecar
#[derive(Debug)]
pub struct RemoteSynthesizer {
    client: reqwest::Client,
    base_url: String,
    sample_rate: u32,
    builtin_voice: bool,
}

impl RemoteSynthesizer {
    /// Connect to the sidecar and read its sample rate
    pub async fn connect(base_url: &str, timeout: Duration) -> Result<Self, SynthesisFailure> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SynthesisFailure::Unavailable(e.to_string()))?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let health: HealthResponse = client
            .get(format!("{}/health", base_url))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SynthesisFailure::Unavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| SynthesisFailure::Unavailable(format!("bad health response: {}", e)))?;

        tracing::info!(
            url = %base_url,
            sample_rate = health.sample_rate,
            builtin_voice = health.builtin_voice,
            "Connected to remote synthesis backend"
        );

        Ok(Self {
            client,
            base_url,
            sample_rate: health.sample_rate,
            builtin_voice: health.builtin_voice,
        })
    }

    /// Override the sidecar's report of a built-in voice
    pub fn with_builtin_voice(mut self, builtin_voice: bool) -> Self {
        self.builtin_voice = builtin_voice;
        self
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for RemoteSynthesizer {
    async fn synthesize(
        &mut self,
        text: &str,
        params: &GenerationParams,
    ) -> Result<RawWaveform, SynthesisFailure> {
        let response = self
            .client
            .post(format!("{}/synthesize", self.base_url))
            .json(&SynthesizeRequest::new(text, params))
            .send()
            .await
            .map_err(|e| SynthesisFailure::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisFailure::Backend(format!("HTTP {}: {}", status, body)));
        }

        let body: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| SynthesisFailure::Backend(format!("bad response body: {}", e)))?;

        body.into_waveform()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn has_builtin_voice(&self) -> bool {
        self.builtin_voice
    }

    fn name(&self) -> &str {
        "remote"
    }
}
