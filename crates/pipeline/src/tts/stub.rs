//! Stub synthesis backend (no model required)

use super::{SpeechSynthesizer, SynthesisFailure};
use tts_gateway_core::{GenerationParams, RawWaveform};

/// Milliseconds of audio produced per input character
const MS_PER_CHAR: usize = 50;
const TONE_HZ: f32 = 220.0;
const AMPLITUDE: f32 = 0.1;

/// Deterministic tone generator whose output length follows the text length.
///
/// Useful for development and for exercising the pipeline without model weights.
#[derive(Debug, Clone)]
pub struct StubSynthesizer {
    sample_rate: u32,
}

impl StubSynthesizer {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Number of samples produced for `text`
    pub fn samples_for(&self, text: &str) -> usize {
        text.chars().count() * (self.sample_rate as usize * MS_PER_CHAR / 1000)
    }
}

impl Default for StubSynthesizer {
    fn default() -> Self {
        Self::new(24000)
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for StubSynthesizer {
    async fn synthesize(
        &mut self,
        text: &str,
        _params: &GenerationParams,
    ) -> Result<RawWaveform, SynthesisFailure> {
        let n = self.samples_for(text);
        let step = 2.0 * std::f32::consts::PI * TONE_HZ / self.sample_rate as f32;
        let samples: Vec<f32> = (0..n).map(|i| AMPLITUDE * (step * i as f32).sin()).collect();

        // Shaped (1, n) like a model's channel-major output
        Ok(RawWaveform::matrix(samples, 1, n, self.sample_rate))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn has_builtin_voice(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_length_follows_text() {
        let mut stub = StubSynthesizer::new(16000);
        let params = GenerationParams::default();

        let short = stub.synthesize("hi", &params).await.unwrap();
        let long = stub.synthesize("hello there", &params).await.unwrap();

        assert_eq!(short.samples.len(), 2 * 800);
        assert_eq!(long.samples.len(), 11 * 800);
        assert_eq!(long.into_segment().unwrap().sample_rate, 16000);
    }

    #[tokio::test]
    async fn test_deterministic_output() {
        let mut stub = StubSynthesizer::default();
        let params = GenerationParams::default();
        let a = stub.synthesize("same text", &params).await.unwrap();
        let b = stub.synthesize("same text", &params).await.unwrap();
        assert_eq!(a, b);
    }
}
