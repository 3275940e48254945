//! Global tempo estimation
//!
//! Spectral-flux onset envelope followed by autocorrelation over the lag
//! range corresponding to 30-300 BPM. A signal with no rhythmic structure
//! (flat envelope, too few frames) estimates to 0.0 BPM rather than failing:
//! the value still participates in the fingerprint deterministically.

use super::spectrum;

/// Slowest tempo considered, in beats per minute.
const MIN_BPM: f32 = 30.0;
/// Fastest tempo considered, in beats per minute.
const MAX_BPM: f32 = 300.0;

/// Onset-strength envelope: per-frame mean positive log-mel flux.
pub fn onset_envelope(power_frames: &[Vec<f32>], mel_filters: &[Vec<f32>]) -> Vec<f32> {
    if power_frames.len() < 2 {
        return Vec::new();
    }

    let log_mel: Vec<Vec<f32>> = power_frames
        .iter()
        .map(|frame| {
            spectrum::apply_filterbank(mel_filters, frame)
                .into_iter()
                .map(|e| (e + 1e-10).ln())
                .collect()
        })
        .collect();

    log_mel
        .windows(2)
        .map(|pair| {
            let flux: f32 = pair[1]
                .iter()
                .zip(pair[0].iter())
                .map(|(cur, prev)| (cur - prev).max(0.0))
                .sum();
            flux / pair[1].len() as f32
        })
        .collect()
}

/// Estimate a single global BPM from an onset envelope.
///
/// `frame_rate` is the envelope's frames-per-second. Returns 0.0 when the
/// envelope is too short or has no periodic structure to measure.
pub fn estimate_bpm(envelope: &[f32], frame_rate: f32) -> f32 {
    let min_lag = ((60.0 * frame_rate / MAX_BPM).round() as usize).max(1);
    let max_lag = (60.0 * frame_rate / MIN_BPM).round() as usize;

    if envelope.len() <= min_lag {
        return 0.0;
    }

    let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
    let centered: Vec<f32> = envelope.iter().map(|&v| v - mean).collect();

    let energy: f32 = centered.iter().map(|v| v * v).sum();
    if energy <= f32::EPSILON {
        // Flat envelope: no measurable periodicity.
        return 0.0;
    }

    let upper = max_lag.min(centered.len() - 1);
    let mut best_lag = 0usize;
    let mut best_score = 0.0f32;

    for lag in min_lag..=upper {
        let score: f32 = centered[lag..]
            .iter()
            .zip(centered.iter())
            .map(|(a, b)| a * b)
            .sum::<f32>()
            / energy;
        if score > best_score {
            best_score = score;
            best_lag = lag;
        }
    }

    if best_lag == 0 {
        return 0.0;
    }

    60.0 * frame_rate / best_lag as f32
}
