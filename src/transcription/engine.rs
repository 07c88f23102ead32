use super::segment::Segment;
use crate::audio::{DecodeError, TARGET_SAMPLE_RATE};
use crate::config::ModelConfig;
use anyhow::Context;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Speech-to-text capability shared by every job (enables testing via mocking)
///
/// Implementations must keep no per-call state on `self`: concurrent jobs
/// call the same instance.
#[cfg_attr(test, mockall::automock)]
pub trait Transcriber: Send + Sync {
    /// Transcribe 16kHz mono samples into timed segments
    ///
    /// Segments come back in non-decreasing start order.
    ///
    /// # Errors
    /// Returns error if inference fails
    fn transcribe(&self, audio_data: &[f32]) -> Result<Vec<Segment>, TranscriptionError>;
}

/// Errors that can occur during transcription
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// Failed to load Whisper model
    #[error("failed to load whisper model from {path}: {source}")]
    ModelLoad {
        /// Path to model file
        path: String,
        /// Underlying error
        source: anyhow::Error,
    },

    /// Downloaded audio could not be turned into samples
    #[error("failed to decode audio: {0}")]
    Decode(#[from] DecodeError),

    /// Failed to create Whisper inference state
    #[error("failed to create whisper state: {0}")]
    StateCreation(String),

    /// Transcription inference failed
    #[error("transcription failed: {0:#}")]
    Transcription(#[from] anyhow::Error),
}

/// Fixed decoding configuration applied to every call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Number of CPU threads for inference
    pub threads: usize,
    /// Beam search width (1 = greedy)
    pub beam_size: usize,
    /// Language code (None = auto-detect)
    pub language: Option<String>,
    /// Window width in seconds (0 = whole file in one call)
    pub chunk_seconds: u32,
}

impl From<&ModelConfig> for DecodeOptions {
    fn from(config: &ModelConfig) -> Self {
        Self {
            threads: config.threads,
            beam_size: config.beam_size,
            language: config
                .language
                .clone()
                .filter(|l| !l.trim().is_empty() && !l.eq_ignore_ascii_case("auto")),
            chunk_seconds: config.chunk_seconds,
        }
    }
}

/// Whisper transcription engine
pub struct TranscriptionEngine {
    /// Loaded weights; inference state is created per call
    ctx: WhisperContext,
    /// Number of CPU threads for inference
    threads: i32,
    /// Beam search width
    beam_size: i32,
    /// Language code (None = auto-detect)
    language: Option<String>,
    /// Samples per window (0 = no windowing)
    chunk_samples: usize,
}

impl TranscriptionEngine {
    /// Determines sampling strategy based on beam size (pure, testable)
    const fn get_sampling_strategy(beam_size: i32) -> SamplingStrategy {
        if beam_size > 1 {
            SamplingStrategy::BeamSearch {
                beam_size,
                patience: -1.0,
            }
        } else {
            SamplingStrategy::Greedy { best_of: 1 }
        }
    }

    /// Creates a new `TranscriptionEngine` by loading the model from the given path
    ///
    /// # Errors
    /// Returns error if model file doesn't exist, is invalid, or if `threads`/`beam_size` exceed `i32::MAX`
    pub fn new(
        model_path: &Path,
        options: DecodeOptions,
        use_gpu: bool,
    ) -> Result<Self, TranscriptionError> {
        let load_err = |msg: String| TranscriptionError::ModelLoad {
            path: model_path.display().to_string(),
            source: anyhow::anyhow!(msg),
        };

        if options.threads == 0 {
            return Err(load_err("threads must be > 0".to_owned()));
        }
        if options.beam_size == 0 {
            return Err(load_err("beam_size must be > 0".to_owned()));
        }

        // whisper-rs takes i32 for both
        let threads = i32::try_from(options.threads)
            .map_err(|_| load_err(format!("threads value too large (max: {})", i32::MAX)))?;
        let beam_size = i32::try_from(options.beam_size)
            .map_err(|_| load_err(format!("beam_size value too large (max: {})", i32::MAX)))?;

        tracing::info!(
            path = %model_path.display(),
            threads = options.threads,
            beam_size = options.beam_size,
            language = ?options.language,
            chunk_seconds = options.chunk_seconds,
            use_gpu = use_gpu,
            "loading whisper model"
        );

        let path_str = model_path
            .to_str()
            .ok_or_else(|| load_err("model path contains invalid UTF-8".to_owned()))?;

        let mut params = WhisperContextParameters::default();
        params.use_gpu(use_gpu);
        let ctx = WhisperContext::new_with_params(path_str, params)
            .map_err(|e| load_err(format!("{e:?}")))?;

        tracing::info!("whisper model loaded successfully");

        Ok(Self {
            ctx,
            threads,
            beam_size,
            language: options.language,
            chunk_samples: chunk_samples(options.chunk_seconds),
        })
    }

    fn full_params(&self) -> FullParams<'_, '_> {
        let mut params = FullParams::new(Self::get_sampling_strategy(self.beam_size));
        params.set_n_threads(self.threads);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_language(self.language.as_deref());
        params.set_translate(false);
        params
    }

    /// Runs one inference pass over a window, timestamps relative to the window
    fn transcribe_window(&self, window: &[f32]) -> Result<Vec<Segment>, TranscriptionError> {
        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| TranscriptionError::StateCreation(format!("{e:?}")))?;

        state
            .full(self.full_params(), window)
            .context("whisper inference failed")?;

        // whisper timestamps are centiseconds
        #[allow(clippy::cast_precision_loss)]
        let segments = state
            .as_iter()
            .map(|segment| {
                let start = segment.start_timestamp() as f64 / 100.0;
                let end = segment.end_timestamp() as f64 / 100.0;
                Segment::new(segment.to_string(), start, (end >= start).then_some(end))
            })
            .collect();

        Ok(segments)
    }
}

impl Transcriber for TranscriptionEngine {
    fn transcribe(&self, audio_data: &[f32]) -> Result<Vec<Segment>, TranscriptionError> {
        let _span = tracing::debug_span!("transcription", samples = audio_data.len()).entered();
        let start = std::time::Instant::now();

        let mut segments = Vec::new();
        for range in chunk_ranges(audio_data.len(), self.chunk_samples) {
            #[allow(clippy::cast_precision_loss)]
            let offset = range.start as f64 / f64::from(TARGET_SAMPLE_RATE);
            let window = self.transcribe_window(&audio_data[range])?;
            segments.extend(window.into_iter().map(|s| s.shifted(offset)));
        }

        tracing::info!(
            segments = segments.len(),
            inference_ms = start.elapsed().as_millis(),
            "transcription completed"
        );

        Ok(segments)
    }
}

fn chunk_samples(chunk_seconds: u32) -> usize {
    usize::try_from(u64::from(chunk_seconds) * u64::from(TARGET_SAMPLE_RATE)).unwrap_or(0)
}

/// Consecutive windows of `chunk` samples covering `len` (one window when `chunk` is 0)
fn chunk_ranges(len: usize, chunk: usize) -> Vec<Range<usize>> {
    if chunk == 0 || len <= chunk {
        return vec![0..len];
    }
    (0..len)
        .step_by(chunk)
        .map(|start| start..(start + chunk).min(len))
        .collect()
}
