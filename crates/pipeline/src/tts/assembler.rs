//! Waveform assembly
//!
//! Joins per-chunk segments in chunk order into one buffer. Joins are hard:
//! no crossfade and no silence trimming.

use tts_gateway_core::{AssembledAudio, AudioError, RawWaveform, WaveformSegment};

/// Incremental assembler for the segments of one request
#[derive(Debug, Default)]
pub struct AudioAssembler {
    samples: Vec<f32>,
    sample_rate: Option<u32>,
    segments: usize,
}

impl AudioAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a raw backend waveform and append it
    pub fn push_raw(&mut self, raw: RawWaveform) -> Result<(), AudioError> {
        self.push(raw.into_segment()?)
    }

    /// Append a segment. All segments must share one sample rate.
    pub fn push(&mut self, segment: WaveformSegment) -> Result<(), AudioError> {
        match self.sample_rate {
            Some(expected) if expected != segment.sample_rate => {
                return Err(AudioError::SampleRateMismatch {
                    expected,
                    actual: segment.sample_rate,
                });
            }
            Some(_) => {}
            None => {
                if segment.sample_rate == 0 {
                    return Err(AudioError::InvalidSampleRate(0));
                }
                self.sample_rate = Some(segment.sample_rate);
            }
        }

        self.samples.extend_from_slice(&segment.samples);
        self.segments += 1;
        Ok(())
    }

    /// Segments appended so far
    pub fn segment_count(&self) -> usize {
        self.segments
    }

    /// Samples appended so far
    pub fn total_samples(&self) -> usize {
        self.samples.len()
    }

    /// Finish assembly
    pub fn finish(self) -> Result<AssembledAudio, AudioError> {
        let sample_rate = self.sample_rate.ok_or(AudioError::Empty)?;
        Ok(AssembledAudio::new(self.samples, sample_rate))
    }
}

/// Concatenate ordered segments into one buffer
pub fn assemble<I>(segments: I) -> Result<AssembledAudio, AudioError>
where
    I: IntoIterator<Item = WaveformSegment>,
{
    let mut assembler = AudioAssembler::new();
    for segment in segments {
        assembler.push(segment)?;
    }
    assembler.finish()
}
