use std::io;
use std::process::{Command, Stdio};

/// Captured result of one external tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exited with status 0
    pub success: bool,
    /// Exit code (None when killed by a signal)
    pub code: Option<i32>,
    /// Raw standard output
    pub stdout: Vec<u8>,
    /// Raw standard error
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Standard output decoded lossily
    #[must_use]
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Standard error decoded lossily
    #[must_use]
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Runs external programs (enables testing via mocking)
///
/// Implementations block until the process exits. Callers on the async
/// runtime must move the call onto the blocking pool.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args`, capturing stdout and stderr
    ///
    /// # Errors
    /// Returns error only when the process cannot be spawned; a non-zero exit
    /// is reported through [`CommandOutput::success`]
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput>;
}

/// [`ProcessRunner`] backed by `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let start = std::time::Instant::now();
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;

        tracing::debug!(
            program = program,
            code = ?output.status.code(),
            elapsed_ms = start.elapsed().as_millis(),
            "external tool finished"
        );

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
