use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable pointing at the worker's TOML config
pub const CONFIG_ENV: &str = "WORKER_CONFIG";

/// Worker configuration, loaded from TOML with every field defaulted
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Whisper model settings
    pub model: ModelConfig,
    /// External media tools
    pub tools: ToolsConfig,
    /// Transcript rendering
    pub transcript: TranscriptConfig,
    /// Local dispatcher settings
    pub worker: WorkerConfig,
    /// Logging
    pub telemetry: TelemetryConfig,
}

/// Whisper model and decoding configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    /// ggml model name (`tiny`, `base.en`, `small`, `large-v3`, ...)
    pub name: String,
    /// Local path of the ggml weights; downloaded on first use when missing
    pub path: String,
    /// CPU threads used by inference
    pub threads: usize,
    /// Beam width (1 = greedy)
    pub beam_size: usize,
    /// Language hint (None = auto-detect)
    pub language: Option<String>,
    /// Window width in seconds for long-form audio (0 = whole file)
    pub chunk_seconds: u32,
    /// Offload inference to the GPU when whisper.cpp was built with support
    pub use_gpu: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "small".to_owned(),
            path: "~/.cache/transcribe-worker/ggml-small.bin".to_owned(),
            threads: 4,
            beam_size: 5,
            language: Some("en".to_owned()),
            chunk_seconds: 30,
            use_gpu: true,
        }
    }
}

/// External downloader/prober configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ToolsConfig {
    /// yt-dlp executable
    pub yt_dlp: String,
    /// ffprobe executable
    pub ffprobe: String,
    /// Container/codec yt-dlp transcodes to
    pub audio_format: String,
    /// Directory the worker creates per-job scratch directories in
    pub temp_dir: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp: "yt-dlp".to_owned(),
            ffprobe: "ffprobe".to_owned(),
            audio_format: "wav".to_owned(),
            temp_dir: std::env::temp_dir().join("transcribe-worker"),
        }
    }
}

/// Transcript formatting configuration
#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(default)]
pub struct TranscriptConfig {
    /// Prefix every segment with `[H:MM:SS]`
    pub timestamps: bool,
}

/// Local dispatcher configuration
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct WorkerConfig {
    /// Maximum jobs in flight at once
    pub concurrency: usize,
    /// Age after which leftover audio files are swept at startup (0 = never)
    pub stale_audio_minutes: u64,
}

impl WorkerConfig {
    /// Age at which the startup sweep deletes scratch directories, `None` if disabled
    #[must_use]
    pub const fn stale_audio_max_age(&self) -> Option<Duration> {
        match self.stale_audio_minutes {
            0 => None,
            minutes => Some(Duration::from_secs(minutes.saturating_mul(60))),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            stale_audio_minutes: 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Log file (empty = stderr)
    pub log_path: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            log_path: String::new(),
        }
    }
}

impl Config {
    /// Load config from `$WORKER_CONFIG`, falling back to defaults
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read, parsed or validated
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load_from(Path::new(&path)),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Load config from an explicit path; a missing file yields defaults
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed or validated
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            Self::parse(&contents)?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse config TOML
    ///
    /// # Errors
    /// Returns error on malformed TOML or mistyped fields
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse config TOML")
    }

    /// Rejects settings the pipeline cannot run with
    ///
    /// # Errors
    /// Returns error naming the first invalid field
    pub fn validate(&self) -> Result<()> {
        if self.model.threads == 0 {
            anyhow::bail!("model.threads must be > 0");
        }
        if self.model.beam_size == 0 {
            anyhow::bail!("model.beam_size must be > 0");
        }
        if self.worker.concurrency == 0 {
            anyhow::bail!("worker.concurrency must be > 0");
        }
        if self.tools.yt_dlp.trim().is_empty() || self.tools.ffprobe.trim().is_empty() {
            anyhow::bail!("tools.yt_dlp and tools.ffprobe must not be empty");
        }
        if self.tools.audio_format.trim().is_empty() {
            anyhow::bail!("tools.audio_format must not be empty");
        }
        Ok(())
    }

    /// Expand ~ in paths to home directory
    ///
    /// # Errors
    /// Returns error if the path starts with `~/` and `HOME` is unset
    pub fn expand_path(path: &str) -> Result<PathBuf> {
        if let Some(stripped) = path.strip_prefix("~/") {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            Ok(PathBuf::from(home).join(stripped))
        } else {
            Ok(PathBuf::from(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.model.name, "small");
        assert_eq!(config.model.beam_size, 5);
        assert_eq!(config.tools.audio_format, "wav");
        assert_eq!(config.worker.concurrency, 1);
        assert!(!config.transcript.timestamps);
        assert!(config.tools.temp_dir.ends_with("transcribe-worker"));
    }

    #[test]
    fn test_stale_audio_max_age() {
        let mut worker = WorkerConfig::default();
        assert_eq!(worker.stale_audio_max_age(), Some(Duration::from_secs(3600)));

        worker.stale_audio_minutes = 0;
        assert_eq!(worker.stale_audio_max_age(), None);

        worker.stale_audio_minutes = u64::MAX;
        assert_eq!(worker.stale_audio_max_age(), Some(Duration::from_secs(u64::MAX)));
    }

    #[test]
    fn test_parse_partial_toml_keeps_defaults() {
        let config = Config::parse(
            r#"
[model]
name = "tiny"
beam_size = 1

[transcript]
timestamps = true
"#,
        )
        .unwrap();

        assert_eq!(config.model.name, "tiny");
        assert_eq!(config.model.beam_size, 1);
        assert_eq!(config.model.threads, 4);
        assert!(config.transcript.timestamps);
        assert_eq!(config.tools.yt_dlp, "yt-dlp");
    }

    #[test]
    fn test_parse_rejects_wrong_types() {
        let result = Config::parse("[model]\nthreads = \"many\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_zero_threads() {
        let mut config = Config::default();
        config.model.threads = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("model.threads"));
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut config = Config::default();
        config.worker.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_audio_format() {
        let mut config = Config::default();
        config.tools.audio_format = "  ".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.model.name, "small");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("worker.toml");
        fs::write(&path, "[worker]\nconcurrency = 3\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.worker.concurrency, 3);
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("worker.toml");
        fs::write(&path, "[model]\nbeam_size = 0\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let result = Config::expand_path("/models/ggml-small.bin").unwrap();
        assert_eq!(result, PathBuf::from("/models/ggml-small.bin"));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let Ok(home) = std::env::var("HOME") else {
            return;
        };
        let result = Config::expand_path("~/models/a.bin").unwrap();
        assert_eq!(result, PathBuf::from(home).join("models/a.bin"));
    }
}
