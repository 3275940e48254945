//! Fingerprint extraction
//!
//! Composes the spectral primitives into the five feature blocks and the
//! final fingerprint. Per-window blocks are averaged over time so the
//! fingerprint has the same dimensionality regardless of input duration.

use tracing::debug;

use super::{
    decoder, spectrum, tempo, AnalysisError, Fingerprint, HARMONY_DIM, HOP_SIZE, N_MEL_BANDS,
    TARGET_SAMPLE_RATE, TIMBRE_DIM, WINDOW_SIZE,
};
use super::spectrum::Stft;

/// Lowest frequency mapped into the harmony block (A0).
const CHROMA_MIN_HZ: f32 = 27.5;

/// Deterministic fingerprint extractor.
///
/// Construction precomputes the FFT plan, analysis window and mel filterbank;
/// one instance is shared across all extractions. Extraction itself is
/// CPU-bound and synchronous; callers offload it to a blocking worker.
pub struct FeatureExtractor {
    stft: Stft,
    mel_filters: Vec<Vec<f32>>,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self {
            stft: Stft::new(WINDOW_SIZE),
            mel_filters: spectrum::mel_filterbank(N_MEL_BANDS, WINDOW_SIZE, TARGET_SAMPLE_RATE),
        }
    }

    /// Extract the fingerprint and duration (seconds) from raw audio bytes.
    ///
    /// Fails with [`AnalysisError::Decode`] when the bytes are not decodable
    /// audio, and [`AnalysisError::Extraction`] when the decoded signal cannot
    /// support feature computation (shorter than one analysis window, or a
    /// feature evaluates to a non-finite value). Partial fingerprints are
    /// never produced.
    pub fn extract(&self, bytes: &[u8]) -> Result<(Fingerprint, f64), AnalysisError> {
        let samples = decoder::decode_to_mono(bytes, TARGET_SAMPLE_RATE)?;
        let duration = samples.len() as f64 / TARGET_SAMPLE_RATE as f64;

        if samples.len() < WINDOW_SIZE {
            return Err(AnalysisError::Extraction(format!(
                "signal too short for analysis: {} samples, need at least {}",
                samples.len(),
                WINDOW_SIZE
            )));
        }

        let power_frames = self.stft.power_frames(&samples, HOP_SIZE);

        let timbre = self.timbre_block(&power_frames);
        let harmony = harmony_block(&power_frames);
        let brightness = brightness_block(&power_frames);
        let percussiveness = percussiveness_block(&samples);

        let envelope = tempo::onset_envelope(&power_frames, &self.mel_filters);
        let bpm = tempo::estimate_bpm(&envelope, super::frame_rate());

        let fingerprint =
            Fingerprint::from_blocks(timbre, harmony, brightness, percussiveness, bpm);

        if fingerprint.as_slice().iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::Extraction(
                "fingerprint contains non-finite values".to_string(),
            ));
        }

        debug!(
            frames = power_frames.len(),
            duration_seconds = duration,
            bpm,
            "fingerprint extracted"
        );

        Ok((fingerprint, duration))
    }

    /// Timbre block: time-averaged cepstral coefficients.
    ///
    /// Log mel energies per window, DCT-II, first [`TIMBRE_DIM`] coefficients.
    fn timbre_block(&self, power_frames: &[Vec<f32>]) -> Vec<f32> {
        let mut mean = vec![0.0f32; TIMBRE_DIM];

        for frame in power_frames {
            let log_mel: Vec<f32> = spectrum::apply_filterbank(&self.mel_filters, frame)
                .into_iter()
                .map(|e| (e + 1e-10).ln())
                .collect();
            let cepstrum = spectrum::dct_ii(&log_mel, TIMBRE_DIM);
            for (acc, c) in mean.iter_mut().zip(cepstrum) {
                *acc += c;
            }
        }

        let n = power_frames.len() as f32;
        for acc in &mut mean {
            *acc /= n;
        }
        mean
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Harmony block: time-averaged pitch-class energy profile.
///
/// Each spectral bin is folded onto its nearest equal-tempered pitch class;
/// per-window profiles are peak-normalized before averaging so loud and quiet
/// windows contribute equally.
fn harmony_block(power_frames: &[Vec<f32>]) -> Vec<f32> {
    let bin_hz = TARGET_SAMPLE_RATE as f32 / WINDOW_SIZE as f32;
    let mut mean = vec![0.0f32; HARMONY_DIM];

    for frame in power_frames {
        let mut profile = vec![0.0f32; HARMONY_DIM];
        for (k, &power) in frame.iter().enumerate().skip(1) {
            let freq = k as f32 * bin_hz;
            if freq < CHROMA_MIN_HZ {
                continue;
            }
            // MIDI note number; A4 = 440 Hz = 69. C maps to pitch class 0.
            let midi = 69.0 + 12.0 * (freq / 440.0).log2();
            let class = (midi.round() as i64).rem_euclid(12) as usize;
            profile[class] += power;
        }

        let peak = profile.iter().copied().fold(0.0f32, f32::max);
        if peak > 0.0 {
            for p in &mut profile {
                *p /= peak;
            }
        }

        for (acc, p) in mean.iter_mut().zip(profile) {
            *acc += p;
        }
    }

    let n = power_frames.len() as f32;
    for acc in &mut mean {
        *acc /= n;
    }
    mean
}

/// Brightness block: time-averaged spectral centroid in Hz.
fn brightness_block(power_frames: &[Vec<f32>]) -> f32 {
    let bin_hz = TARGET_SAMPLE_RATE as f32 / WINDOW_SIZE as f32;

    let mut sum = 0.0f32;
    for frame in power_frames {
        let mut weighted = 0.0f32;
        let mut total = 0.0f32;
        for (k, &power) in frame.iter().enumerate() {
            let magnitude = power.sqrt();
            weighted += k as f32 * bin_hz * magnitude;
            total += magnitude;
        }
        if total > 0.0 {
            sum += weighted / total;
        }
    }

    sum / power_frames.len() as f32
}

/// Percussiveness block: time-averaged zero-crossing rate.
///
/// Framed the same way as the spectral blocks (window/hop), computed on the
/// raw waveform.
fn percussiveness_block(samples: &[f32]) -> f32 {
    let num_frames = (samples.len() - WINDOW_SIZE) / HOP_SIZE + 1;

    let mut sum = 0.0f32;
    for f in 0..num_frames {
        let frame = &samples[f * HOP_SIZE..f * HOP_SIZE + WINDOW_SIZE];
        let crossings = frame
            .windows(2)
            .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
            .count();
        sum += crossings as f32 / (WINDOW_SIZE - 1) as f32;
    }

    sum / num_frames as f32
}
