//! Audio decoding to mono PCM at the fixed analysis rate
//!
//! Uses symphonia for format probing/decoding and rubato for resampling.
//! Any decodable format is accepted; channels beyond the first pair are
//! averaged into the mono signal.

use std::io::Cursor;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use super::AnalysisError;

/// Decode audio bytes to mono f32 samples at `target_rate`.
///
/// Multi-channel audio is averaged down to one channel. Sources at a
/// different native rate are resampled; sources already at `target_rate`
/// pass through untouched so extraction stays bit-deterministic.
pub fn decode_to_mono(bytes: &[u8], target_rate: u32) -> Result<Vec<f32>, AnalysisError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    // No filename hint: probe on content alone.
    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AnalysisError::Decode(format!("unrecognized audio format: {e}")))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AnalysisError::Decode("no audio track found".to_string()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let native_rate = codec_params
        .sample_rate
        .ok_or_else(|| AnalysisError::Decode("sample rate not specified".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AnalysisError::Decode(format!("failed to create decoder: {e}")))?;

    let mut mono: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(AnalysisError::Decode(format!("failed to read packet: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Recoverable per-packet corruption: skip and keep going.
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(error = %e, "skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(AnalysisError::Decode(format!("decode failed: {e}"))),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let frames = decoded.frames();

        if sample_buf
            .as_ref()
            .map_or(true, |b| b.capacity() < frames * channels)
        {
            sample_buf = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
        }

        if let Some(buf) = &mut sample_buf {
            buf.copy_interleaved_ref(decoded);
            mono.reserve(frames);
            for frame in buf.samples().chunks_exact(channels) {
                mono.push(frame.iter().sum::<f32>() / channels as f32);
            }
        }
    }

    if mono.is_empty() {
        return Err(AnalysisError::Decode("no audio frames decoded".to_string()));
    }

    debug!(
        frames = mono.len(),
        native_rate, target_rate, "decoded audio to mono"
    );

    if native_rate == target_rate {
        Ok(mono)
    } else {
        resample_mono(mono, native_rate, target_rate)
    }
}

/// Resample mono PCM with rubato's sinc interpolator.
///
/// 256-tap filter, 0.95 cutoff, BlackmanHarris2 window; the whole signal is
/// processed as a single chunk.
fn resample_mono(samples: Vec<f32>, source_rate: u32, target_rate: u32) -> Result<Vec<f32>, AnalysisError> {
    let num_frames = samples.len();

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / source_rate as f64;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, num_frames, 1)
        .map_err(|e| AnalysisError::Decode(format!("failed to create resampler: {e}")))?;

    let output = resampler
        .process(&[samples], None)
        .map_err(|e| AnalysisError::Decode(format!("resampling failed: {e}")))?;

    let resampled = output.into_iter().next().unwrap_or_default();

    debug!(
        source_rate,
        target_rate,
        output_frames = resampled.len(),
        "resampled audio"
    );

    Ok(resampled)
}
