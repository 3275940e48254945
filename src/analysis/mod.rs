//! Acoustic feature extraction
//!
//! Turns raw audio bytes into a fixed-length fingerprint vector that can be
//! compared across riffs of arbitrary duration. All extraction parameters in
//! this module are process-wide constants: fingerprints computed under
//! different parameters (sample rate, block sizes, block order) are not
//! comparable, so changing any of them invalidates every stored fingerprint.

pub mod decoder;
pub mod features;
pub mod spectrum;
pub mod tempo;

use thiserror::Error;

pub use features::FeatureExtractor;

/// All audio is resampled to this rate before analysis.
pub const TARGET_SAMPLE_RATE: u32 = 22_050;

/// STFT analysis window length in samples.
pub const WINDOW_SIZE: usize = 2048;

/// Hop between consecutive analysis windows in samples.
pub const HOP_SIZE: usize = 512;

/// Number of cepstral coefficients in the timbre block.
pub const TIMBRE_DIM: usize = 20;

/// Number of pitch-class bins in the harmony block.
pub const HARMONY_DIM: usize = 12;

/// Number of mel bands used for the cepstral and onset computations.
pub const N_MEL_BANDS: usize = 128;

/// Total fingerprint dimensionality: timbre + harmony + brightness +
/// percussiveness + tempo, concatenated in that order.
pub const FINGERPRINT_DIM: usize = TIMBRE_DIM + HARMONY_DIM + 3;

/// Analysis frames per second at the target rate.
pub fn frame_rate() -> f32 {
    TARGET_SAMPLE_RATE as f32 / HOP_SIZE as f32
}

/// Errors from fingerprint extraction.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The bytes could not be decoded as audio at all.
    #[error("failed to decode audio: {0}")]
    Decode(String),

    /// The audio decoded but a feature computation could not run on it
    /// (degenerate signal, analysis timeout, numeric failure).
    #[error("feature extraction failed: {0}")]
    Extraction(String),
}

/// Fixed-length acoustic fingerprint of one recording.
///
/// Derived once, never mutated. Two fingerprints are only comparable when
/// produced by the same extraction configuration; [`FINGERPRINT_DIM`] is the
/// dimensionality for the current configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprint(Vec<f32>);

impl Fingerprint {
    /// Concatenate the five feature blocks in their fixed order.
    pub fn from_blocks(
        timbre: Vec<f32>,
        harmony: Vec<f32>,
        brightness: f32,
        percussiveness: f32,
        tempo_bpm: f32,
    ) -> Self {
        debug_assert_eq!(timbre.len(), TIMBRE_DIM);
        debug_assert_eq!(harmony.len(), HARMONY_DIM);

        let mut values = Vec::with_capacity(FINGERPRINT_DIM);
        values.extend(timbre);
        values.extend(harmony);
        values.push(brightness);
        values.push(percussiveness);
        values.push(tempo_bpm);
        Self(values)
    }

    /// Wrap an already-computed feature vector.
    pub fn from_raw(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Euclidean distance to another fingerprint of the same dimensionality.
    pub fn distance_to(&self, other: &Fingerprint) -> f32 {
        debug_assert_eq!(self.len(), other.len());
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }
}
