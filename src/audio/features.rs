use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Number of bins produced by the block spectrum heuristic (block size / 2).
pub const SPECTRUM_BINS: usize = 512;

/// One decoded channel of PCM audio. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    duration_secs: f64,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidSampleRate(sample_rate));
        }
        if samples.is_empty() {
            return Err(AnalysisError::EmptyBuffer);
        }
        let duration_secs = samples.len() as f64 / sample_rate as f64;
        Ok(Self {
            samples,
            sample_rate,
            duration_secs,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Coarse per-bin block energy. Not a frequency transform.
#[derive(Clone, Debug, PartialEq)]
pub struct SpectrumEstimate(pub Vec<f64>);

impl SpectrumEstimate {
    pub fn bins(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_silent(&self) -> bool {
        self.0.iter().all(|&b| b == 0.0)
    }
}

/// Result of one analysis run, consumed by the presentation layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    /// Weighted composite, always within [0, 10]
    pub overall_quality: f64,
    /// Sample standard deviation scaled to percent, capped at 100
    pub clarity: f64,
    /// Low-bin spectrum energy, [0, 100]
    pub bass_quality: f64,
    /// High-bin spectrum energy, [0, 100]
    pub treble_quality: f64,
    /// Peak-to-peak range in dB relative to 0.1; 0 for a degenerate range
    pub dynamic_range: f64,
    /// Estimated bitrate in kbps (assumes 32-bit float samples)
    pub bitrate: u32,
    /// Root mean square amplitude
    pub rms: f64,
    /// Duration in seconds
    pub duration: f64,
}
