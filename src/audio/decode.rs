use hound::{SampleFormat, WavReader};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Sample rate whisper expects
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Errors that can occur while decoding downloaded audio
#[derive(Debug, Error)]
pub enum DecodeError {
    /// File is not a readable WAV
    #[error("failed to read WAV {path}: {source}")]
    Read {
        /// Offending file
        path: String,
        /// Underlying error
        source: hound::Error,
    },

    /// WAV encoding we do not handle
    #[error("unsupported WAV encoding: {format:?} {bits}-bit")]
    Unsupported {
        /// Integer or float
        format: SampleFormat,
        /// Bits per sample
        bits: u16,
    },

    /// Header claims zero channels or a zero sample rate
    #[error("invalid WAV header: {channels} channels at {sample_rate} Hz")]
    InvalidHeader {
        /// Channel count
        channels: u16,
        /// Sample rate
        sample_rate: u32,
    },
}

/// Reads a WAV file as 16kHz mono f32 samples in [-1, 1]
///
/// # Errors
/// Returns error if the file is unreadable or uses an unsupported encoding
pub fn load_pcm_16k_mono(path: &Path) -> Result<Vec<f32>, DecodeError> {
    let _span = tracing::debug_span!("decode_audio", path = %path.display()).entered();
    let read_err = |source| DecodeError::Read {
        path: path.display().to_string(),
        source,
    };

    let reader = WavReader::open(path).map_err(read_err)?;
    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(DecodeError::InvalidHeader {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
        });
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(read_err)?,
        (SampleFormat::Int, bits @ 1..=32) => {
            // Full-scale value for the declared bit depth
            let scale = f64::from(1_u32 << (bits - 1));
            reader
                .into_samples::<i32>()
                .map(|s| {
                    #[allow(clippy::cast_possible_truncation)]
                    s.map(|v| (f64::from(v) / scale) as f32)
                })
                .collect::<Result<_, _>>()
                .map_err(read_err)?
        }
        (format, bits) => return Err(DecodeError::Unsupported { format, bits }),
    };

    debug!(
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        samples = interleaved.len(),
        "wav decoded"
    );

    if spec.channels == 1 && spec.sample_rate == TARGET_SAMPLE_RATE {
        return Ok(interleaved);
    }

    // Only reached when ffmpeg did not already downmix and resample
    Ok(convert_to_16khz_mono(
        &interleaved,
        spec.sample_rate,
        spec.channels,
    ))
}

/// Downmixes interleaved samples to mono and resamples to 16kHz
#[must_use]
pub fn convert_to_16khz_mono(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<f32> {
    let mono_samples = downmix(samples, channels);

    if sample_rate == TARGET_SAMPLE_RATE || mono_samples.is_empty() {
        return mono_samples;
    }

    let start_resample = std::time::Instant::now();
    let resampled = resample_linear(&mono_samples, sample_rate, TARGET_SAMPLE_RATE);
    info!(
        source_rate = sample_rate,
        target_rate = TARGET_SAMPLE_RATE,
        input_samples = mono_samples.len(),
        output_samples = resampled.len(),
        resample_ms = start_resample.elapsed().as_millis(),
        "resampling completed"
    );
    resampled
}

fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    // Average channels (simple downmix)
    let channels_f64 = f64::from(channels);
    samples
        .chunks(usize::from(channels))
        .map(|frame| {
            let sum_f64: f64 = frame.iter().map(|&s| f64::from(s)).sum();
            #[allow(clippy::cast_possible_truncation)]
            {
                (sum_f64 / channels_f64) as f32
            }
        })
        .collect()
}

/// Linear interpolation resampling
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    let ratio = f64::from(from_rate) / f64::from(to_rate);

    let output_len_f64 = (samples.len() as f64) / ratio;
    let output_len = if output_len_f64.is_finite() && output_len_f64 >= 0.0 {
        output_len_f64.ceil() as usize
    } else {
        samples.len()
    };

    let last = samples.len().saturating_sub(1);
    (0..output_len)
        .map(|i| {
            let src_idx_f64 = (i as f64) * ratio;
            let src_idx_floor = src_idx_f64.floor() as usize;
            if src_idx_floor >= samples.len() {
                return 0.0_f32;
            }
            let src_idx_ceil = (src_idx_floor + 1).min(last);
            let fract = src_idx_f64 - src_idx_f64.floor();

            let s1 = f64::from(samples[src_idx_floor]);
            let s2 = f64::from(samples[src_idx_ceil]);
            s1.mul_add(1.0 - fract, s2 * fract) as f32
        })
        .collect()
}
