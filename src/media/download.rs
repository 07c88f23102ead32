use super::process::{CommandOutput, ProcessRunner};
use crate::audio::TARGET_SAMPLE_RATE;
use crate::config::ToolsConfig;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use thiserror::Error;

/// Prefix of every per-job scratch directory
pub const JOB_DIR_PREFIX: &str = "audio_";

/// Random characters after [`JOB_DIR_PREFIX`]
const JOB_DIR_RAND_LEN: usize = 12;

/// File stem yt-dlp writes inside the job directory
const AUDIO_STEM: &str = "audio";

/// Whether `name` has the shape of a directory created by [`AudioDownloader::acquire`]
#[must_use]
pub fn is_job_dir_name(name: &str) -> bool {
    name.strip_prefix(JOB_DIR_PREFIX).is_some_and(|suffix| {
        suffix.len() == JOB_DIR_RAND_LEN && suffix.bytes().all(|b| b.is_ascii_alphanumeric())
    })
}

/// Errors that can occur while acquiring audio
#[derive(Debug, Error)]
pub enum DownloadError {
    /// No URL to download
    #[error("audio URL must not be empty")]
    EmptyUrl,

    /// Per-job scratch directory could not be created
    #[error("failed to create scratch directory in {}: {source}", dir.display())]
    Scratch {
        /// Parent directory
        dir: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Downloader could not be started
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Executable that failed to start
        program: String,
        /// Underlying error
        source: io::Error,
    },

    /// Downloader exited non-zero; carries its diagnostics verbatim
    #[error("yt-dlp failed: {0}")]
    Failed(String),

    /// Downloader exited zero but left no output file
    #[error("yt-dlp reported success but {} was not created", path.display())]
    MissingOutput {
        /// Expected output path
        path: PathBuf,
    },
}

/// Locally materialized audio owned by one job
///
/// The file lives in its own scratch directory. Dropping the handle removes
/// the directory along with anything yt-dlp left in it.
#[derive(Debug)]
pub struct AudioFile {
    path: PathBuf,
    dir: TempDir,
}

impl AudioFile {
    /// Location on disk
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the scratch directory now, logging instead of ignoring failures
    pub fn close(self) {
        let dir = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => tracing::debug!(dir = %dir.display(), "deleted audio scratch directory"),
            Err(e) => tracing::warn!(
                dir = %dir.display(),
                error = %e,
                "failed to delete audio scratch directory"
            ),
        }
    }
}

/// Downloads and transcodes remote media through yt-dlp
pub struct AudioDownloader {
    runner: Arc<dyn ProcessRunner>,
    program: String,
    audio_format: String,
    temp_dir: PathBuf,
}

impl AudioDownloader {
    /// Creates a downloader using the configured tool and scratch directory
    #[must_use]
    pub fn new(runner: Arc<dyn ProcessRunner>, tools: &ToolsConfig) -> Self {
        Self {
            runner,
            program: tools.yt_dlp.clone(),
            audio_format: tools.audio_format.clone(),
            temp_dir: tools.temp_dir.clone(),
        }
    }

    /// Downloads the best audio stream at `url` into a fresh local file
    ///
    /// Blocks until the downloader exits.
    ///
    /// # Errors
    /// Returns error if `url` is empty, the scratch directory cannot be
    /// created, the downloader cannot be started, exits non-zero, or
    /// produces no file
    pub fn acquire(&self, url: &str) -> Result<AudioFile, DownloadError> {
        if url.trim().is_empty() {
            return Err(DownloadError::EmptyUrl);
        }

        let dir = self.scratch_dir()?;
        let output_path = dir
            .path()
            .join(format!("{AUDIO_STEM}.{}", self.audio_format));
        let args = self.build_args(dir.path(), url);

        tracing::info!(url = url, path = %output_path.display(), "downloading audio");
        let start = std::time::Instant::now();

        let output = self
            .runner
            .run(&self.program, &args)
            .map_err(|source| DownloadError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Early returns drop `dir`, taking partial downloads with it
        if !output.success {
            let diagnostics = diagnostics(&output);
            tracing::warn!(code = ?output.code, diagnostics = %diagnostics, "yt-dlp failed");
            return Err(DownloadError::Failed(diagnostics));
        }

        if !output_path.is_file() {
            return Err(DownloadError::MissingOutput { path: output_path });
        }

        tracing::info!(
            path = %output_path.display(),
            download_ms = start.elapsed().as_millis(),
            "audio downloaded"
        );
        Ok(AudioFile {
            path: output_path,
            dir,
        })
    }

    fn scratch_dir(&self) -> Result<TempDir, DownloadError> {
        let scratch_err = |source| DownloadError::Scratch {
            dir: self.temp_dir.clone(),
            source,
        };
        fs::create_dir_all(&self.temp_dir).map_err(scratch_err)?;
        tempfile::Builder::new()
            .prefix(JOB_DIR_PREFIX)
            .rand_bytes(JOB_DIR_RAND_LEN)
            .tempdir_in(&self.temp_dir)
            .map_err(scratch_err)
    }

    fn build_args(&self, dir: &Path, url: &str) -> Vec<String> {
        let template = dir.join(format!("{AUDIO_STEM}.%(ext)s"));
        vec![
            "-f".to_owned(),
            "bestaudio".to_owned(),
            "--extract-audio".to_owned(),
            "--audio-format".to_owned(),
            self.audio_format.clone(),
            // Have ffmpeg emit whisper's input format directly
            "--postprocessor-args".to_owned(),
            format!("ExtractAudio+ffmpeg_o:-ar {TARGET_SAMPLE_RATE} -ac 1"),
            "--no-playlist".to_owned(),
            "--no-progress".to_owned(),
            "-o".to_owned(),
            template.display().to_string(),
            // Everything after this is a URL, never an option
            "--".to_owned(),
            url.to_owned(),
        ]
    }
}

/// Picks the most useful diagnostic text: stderr, else stdout, else the exit code
fn diagnostics(output: &CommandOutput) -> String {
    let stderr = output.stderr_lossy();
    if !stderr.trim().is_empty() {
        return stderr.trim().to_owned();
    }
    let stdout = output.stdout_lossy();
    if !stdout.trim().is_empty() {
        return stdout.trim().to_owned();
    }
    output.code.map_or_else(
        || "terminated by signal".to_owned(),
        |code| format!("exit status {code}"),
    )
}
