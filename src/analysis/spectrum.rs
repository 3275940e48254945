//! Spectral primitives: windowed STFT, mel filterbank, DCT
//!
//! These are the building blocks the feature extractor composes into the
//! timbre/harmony/brightness blocks. Windowing uses a periodic Hann window;
//! the mel scale is the HTK variant.

use std::sync::Arc;

use rustfft::{num_complex::Complex32, Fft, FftPlanner};

/// Periodic Hann window of length `n`.
pub fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / n as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

pub fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

pub fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}

/// Short-time Fourier transform with a fixed window size.
///
/// The FFT plan and window are computed once and shared across frames.
pub struct Stft {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
}

impl Stft {
    pub fn new(window_size: usize) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(window_size);
        Self {
            fft,
            window: hann_window(window_size),
        }
    }

    /// Power spectrum per analysis frame.
    ///
    /// Frames start every `hop` samples; trailing samples shorter than one
    /// window are dropped. Each frame holds `window_size / 2 + 1` bins.
    pub fn power_frames(&self, samples: &[f32], hop: usize) -> Vec<Vec<f32>> {
        let n = self.window.len();
        if samples.len() < n {
            return Vec::new();
        }

        let num_frames = (samples.len() - n) / hop + 1;
        let half = n / 2 + 1;

        let mut scratch = vec![Complex32::default(); self.fft.get_inplace_scratch_len()];
        let mut buffer = vec![Complex32::default(); n];
        let mut frames = Vec::with_capacity(num_frames);

        for f in 0..num_frames {
            let start = f * hop;
            for (i, slot) in buffer.iter_mut().enumerate() {
                *slot = Complex32::new(samples[start + i] * self.window[i], 0.0);
            }
            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            frames.push(buffer[..half].iter().map(|c| c.norm_sqr()).collect());
        }

        frames
    }
}

/// Triangular mel filterbank, `n_mels` filters over `n_fft / 2 + 1` bins.
pub fn mel_filterbank(n_mels: usize, n_fft: usize, sample_rate: u32) -> Vec<Vec<f32>> {
    let half = n_fft / 2 + 1;
    let max_mel = hz_to_mel(sample_rate as f32 / 2.0);

    // n_mels + 2 equally spaced mel points define the triangle edges.
    let mel_points: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(max_mel * i as f32 / (n_mels + 1) as f32))
        .collect();

    let bin_hz = sample_rate as f32 / n_fft as f32;

    let mut filters = Vec::with_capacity(n_mels);
    for m in 0..n_mels {
        let (lower, center, upper) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
        let mut filter = vec![0.0f32; half];

        for (k, weight) in filter.iter_mut().enumerate() {
            let freq = k as f32 * bin_hz;
            if freq > lower && freq < center {
                *weight = (freq - lower) / (center - lower);
            } else if freq >= center && freq < upper {
                *weight = (upper - freq) / (upper - center);
            }
        }

        filters.push(filter);
    }

    filters
}

/// Apply a filterbank to one power frame.
pub fn apply_filterbank(filters: &[Vec<f32>], power: &[f32]) -> Vec<f32> {
    filters
        .iter()
        .map(|filter| {
            filter
                .iter()
                .zip(power.iter())
                .map(|(w, p)| w * p)
                .sum::<f32>()
        })
        .collect()
}

/// Orthonormal DCT-II of `input`, truncated to the first `n_out` coefficients.
pub fn dct_ii(input: &[f32], n_out: usize) -> Vec<f32> {
    let n = input.len();
    debug_assert!(n > 0 && n_out <= n);

    let scale0 = (1.0 / n as f32).sqrt();
    let scale = (2.0 / n as f32).sqrt();

    (0..n_out)
        .map(|k| {
            let sum: f32 = input
                .iter()
                .enumerate()
                .map(|(i, &x)| {
                    x * (std::f32::consts::PI / n as f32 * (i as f32 + 0.5) * k as f32).cos()
                })
                .sum();
            sum * if k == 0 { scale0 } else { scale }
        })
        .collect()
}
