//! Audio buffers
//!
//! A synthesis backend hands back a [`RawWaveform`]: samples of whatever float
//! width it computes in, laid out either flat or as a 2-D array whose axis
//! order is not guaranteed. Everything downstream works with the canonical
//! [`WaveformSegment`]: mono, `f32`, time-major.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AudioError, Error};

/// Sample storage as produced by a backend
#[derive(Debug, Clone, PartialEq)]
pub enum SampleBuffer {
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl SampleBuffer {
    /// Number of samples
    pub fn len(&self) -> usize {
        match self {
            SampleBuffer::F32(v) => v.len(),
            SampleBuffer::F64(v) => v.len(),
        }
    }

    /// Is the buffer empty?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coerce to single precision
    fn into_f32(self) -> Vec<f32> {
        match self {
            SampleBuffer::F32(v) => v,
            SampleBuffer::F64(v) => v.into_iter().map(|s| s as f32).collect(),
        }
    }
}

impl From<Vec<f32>> for SampleBuffer {
    fn from(v: Vec<f32>) -> Self {
        SampleBuffer::F32(v)
    }
}

impl From<Vec<f64>> for SampleBuffer {
    fn from(v: Vec<f64>) -> Self {
        SampleBuffer::F64(v)
    }
}

/// Layout of a raw waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveShape {
    /// One-dimensional sample sequence
    Flat,
    /// Two-dimensional, row-major storage of `rows x cols` values
    Matrix { rows: usize, cols: usize },
}

/// Waveform exactly as returned by a synthesis backend
#[derive(Debug, Clone, PartialEq)]
pub struct RawWaveform {
    pub samples: SampleBuffer,
    pub shape: WaveShape,
    pub sample_rate: u32,
}

impl RawWaveform {
    /// Flat mono waveform
    pub fn mono(samples: impl Into<SampleBuffer>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            shape: WaveShape::Flat,
            sample_rate,
        }
    }

    /// Two-dimensional waveform stored row-major
    pub fn matrix(samples: impl Into<SampleBuffer>, rows: usize, cols: usize, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            shape: WaveShape::Matrix { rows, cols },
            sample_rate,
        }
    }

    /// Normalize into the canonical mono, time-major, `f32` segment.
    ///
    /// A matrix whose first axis is shorter than its second is channel-major
    /// and is read transposed. Only single-channel audio is accepted; a lone
    /// channel has the same memory layout in either axis order, so the
    /// transpose never moves data.
    pub fn into_segment(self) -> Result<WaveformSegment, AudioError> {
        if self.sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate(self.sample_rate));
        }

        if let WaveShape::Matrix { rows, cols } = self.shape {
            let expected = rows * cols;
            if expected != self.samples.len() {
                return Err(AudioError::ShapeMismatch {
                    expected,
                    actual: self.samples.len(),
                });
            }

            if expected > 0 {
                let channels = if rows < cols { rows } else { cols };
                if channels != 1 {
                    return Err(AudioError::NotMono { channels });
                }
            }
        }

        let samples = self.samples.into_f32();
        if let Some(idx) = samples.iter().position(|s| !s.is_finite()) {
            return Err(AudioError::NonFinite(idx));
        }

        Ok(WaveformSegment::new(samples, self.sample_rate))
    }
}

/// Canonical mono waveform for one synthesized chunk
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformSegment {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl WaveformSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Is the segment empty?
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Full result of a batch request
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub duration_seconds: f64,
}

impl AssembledAudio {
    /// Build from a complete sample buffer; duration is derived from it
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        let duration_seconds = samples.len() as f64 / sample_rate as f64;
        Self {
            samples,
            sample_rate,
            duration_seconds,
        }
    }

    /// Total number of samples
    pub fn total_samples(&self) -> usize {
        self.samples.len()
    }
}

/// Wire encodings for streamed audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AudioEncoding {
    /// 16-bit signed little-endian PCM
    #[default]
    #[serde(rename = "pcm_16")]
    Pcm16,
}

impl AudioEncoding {
    /// Wire tag
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioEncoding::Pcm16 => "pcm_16",
        }
    }

    /// Encode samples into this format
    pub fn encode(&self, samples: &[f32]) -> Vec<u8> {
        match self {
            AudioEncoding::Pcm16 => encode_pcm16(samples),
        }
    }
}

impl FromStr for AudioEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pcm_16" => Ok(AudioEncoding::Pcm16),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert f32 samples to 16-bit little-endian PCM bytes
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let value = (clamped * 32767.0) as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}
