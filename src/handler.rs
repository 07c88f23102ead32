use crate::audio::load_pcm_16k_mono;
use crate::config::Config;
use crate::job::{Job, JobResult};
use crate::media::{AudioDownloader, DownloadError, DurationProbe, SystemRunner};
use crate::transcription::{
    format_transcript, ModelCell, ModelInitError, TranscriptMode, Transcriber,
    TranscriptionError,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;

/// Every way a job can fail; `Display` is the message sent back to the caller
#[derive(Debug, Error)]
pub enum JobError {
    /// Input lacks a usable `audio_url`
    #[error("Missing 'audio_url' in input")]
    MissingAudioUrl,

    /// Downloader failed
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Probe returned the `0.0` sentinel
    #[error("Could not determine audio duration after download.")]
    DurationUnknown,

    /// Model could not be initialized
    #[error(transparent)]
    ModelInit(#[from] ModelInitError),

    /// Decoding or inference failed
    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    /// A blocking pipeline step panicked
    #[error("pipeline step aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

/// Runs the download → probe → transcribe → format pipeline for one job
pub struct JobHandler {
    downloader: Arc<AudioDownloader>,
    probe: Arc<DurationProbe>,
    model: ModelCell,
    default_mode: TranscriptMode,
}

impl JobHandler {
    /// Assembles a handler from its collaborators
    #[must_use]
    pub fn new(
        downloader: AudioDownloader,
        probe: DurationProbe,
        model: ModelCell,
        default_mode: TranscriptMode,
    ) -> Self {
        Self {
            downloader: Arc::new(downloader),
            probe: Arc::new(probe),
            model,
            default_mode,
        }
    }

    /// Production handler: real yt-dlp/ffprobe and a lazily loaded whisper model
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let runner = Arc::new(SystemRunner);
        Self::new(
            AudioDownloader::new(runner.clone(), &config.tools),
            DurationProbe::new(runner, config.tools.ffprobe.clone()),
            ModelCell::whisper(&config.model),
            TranscriptMode::from_flag(config.transcript.timestamps),
        )
    }

    /// Shared model slot, for warm-up or readiness checks
    #[must_use]
    pub const fn model(&self) -> &ModelCell {
        &self.model
    }

    /// Processes one job; never fails, errors come back as [`JobResult::Failure`]
    pub async fn handle(&self, job: &Job) -> JobResult {
        let span = tracing::info_span!("job", job_id = job.id.as_deref().unwrap_or("-"));

        async {
            let start = std::time::Instant::now();
            match self.run(job).await {
                Ok(result) => {
                    tracing::info!(elapsed_ms = start.elapsed().as_millis(), "job completed");
                    result
                }
                Err(e) => {
                    tracing::warn!(error = %e, elapsed_ms = start.elapsed().as_millis(), "job failed");
                    JobResult::failure(e.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, job: &Job) -> Result<JobResult, JobError> {
        let url = job.audio_url().ok_or(JobError::MissingAudioUrl)?.to_owned();
        let mode = job
            .timestamps()
            .map_or(self.default_mode, TranscriptMode::from_flag);

        let downloader = Arc::clone(&self.downloader);
        // Deleted on drop, whichever way this function returns
        let audio = tokio::task::spawn_blocking(move || downloader.acquire(&url)).await??;

        let probe = Arc::clone(&self.probe);
        let path = audio.path().to_path_buf();
        let duration = tokio::task::spawn_blocking(move || probe.probe(&path)).await?;
        if duration <= 0.0 {
            return Err(JobError::DurationUnknown);
        }
        tracing::info!(duration_seconds = duration, "audio ready");

        let model = self.model.ensure_ready().await?;

        let path = audio.path().to_path_buf();
        let segments = tokio::task::spawn_blocking(move || {
            let samples = load_pcm_16k_mono(&path)?;
            model.transcribe(&samples)
        })
        .await??;

        let transcript = format_transcript(&segments, mode).trim().to_owned();
        audio.close();

        Ok(JobResult::Success {
            transcript,
            duration_seconds: duration,
        })
    }
}
