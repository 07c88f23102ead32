/// yt-dlp audio acquisition
pub mod download;
/// ffprobe duration probe
pub mod probe;
/// External process capability
pub mod process;

pub use download::{AudioDownloader, AudioFile, DownloadError};
pub use probe::DurationProbe;
pub use process::{CommandOutput, ProcessRunner, SystemRunner};
