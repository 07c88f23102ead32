use super::process::ProcessRunner;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Reasons a probe yields no duration (logged, never returned to callers)
#[derive(Debug, Error)]
enum ProbeError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("ffprobe exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("unparsable duration output: {0:?}")]
    Unparsable(String),

    #[error("non-positive duration: {0}")]
    NonPositive(f64),
}

/// Reads container duration with ffprobe
pub struct DurationProbe {
    runner: Arc<dyn ProcessRunner>,
    program: String,
}

impl DurationProbe {
    /// Creates a probe running `program` (normally `ffprobe`)
    #[must_use]
    pub fn new(runner: Arc<dyn ProcessRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    /// Duration of `path` in seconds, or `0.0` when it cannot be determined
    ///
    /// Never fails: callers treat `0.0` as "unknown duration". Blocks until
    /// the prober exits.
    #[must_use]
    pub fn probe(&self, path: &Path) -> f64 {
        match self.try_probe(path) {
            Ok(seconds) => {
                tracing::debug!(path = %path.display(), seconds = seconds, "probed duration");
                seconds
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not determine duration");
                0.0
            }
        }
    }

    fn try_probe(&self, path: &Path) -> Result<f64, ProbeError> {
        let args = vec![
            "-v".to_owned(),
            "error".to_owned(),
            "-show_entries".to_owned(),
            "format=duration".to_owned(),
            "-of".to_owned(),
            "default=noprint_wrappers=1:nokey=1".to_owned(),
            path.display().to_string(),
        ];

        let output = self
            .runner
            .run(&self.program, &args)
            .map_err(|source| ProbeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.success {
            return Err(ProbeError::Failed {
                code: output.code,
                stderr: output.stderr_lossy().trim().to_owned(),
            });
        }

        parse_duration(&output.stdout_lossy())
    }
}

fn parse_duration(stdout: &str) -> Result<f64, ProbeError> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| ProbeError::Unparsable(stdout.to_owned()))?;

    let seconds: f64 = line
        .parse()
        .map_err(|_| ProbeError::Unparsable(line.to_owned()))?;

    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(ProbeError::NonPositive(seconds));
    }

    Ok(seconds)
}
