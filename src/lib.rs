//! Transcribe Worker - serverless speech-to-text job handler
//!
//! Downloads the audio behind a URL with yt-dlp, probes its duration with
//! ffprobe, transcribes it with a lazily loaded whisper model and returns a
//! JSON-shaped result. One [`handler::JobHandler`] serves every job of the
//! process.

/// Audio decoding
pub mod audio;
/// Startup sweep of orphaned audio files
pub mod cleanup;
/// Configuration management
pub mod config;
/// Per-job pipeline orchestration
pub mod handler;
/// Job input and result shapes
pub mod job;
/// External media tools (download, probe)
pub mod media;
/// Logging setup
pub mod telemetry;
/// Whisper transcription engine
pub mod transcription;
/// Line-delimited JSON job loop
pub mod worker;

pub use handler::{JobError, JobHandler};
pub use job::{Job, JobResult};
