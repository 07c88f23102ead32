use crate::media::download::is_job_dir_name;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Deletes per-job scratch directories older than `max_age` from `dir`
///
/// Jobs delete their own audio; this catches directories orphaned by a
/// crashed process sharing the same scratch volume. Only directories named
/// the way the downloader names them are touched. Returns the number deleted.
///
/// # Errors
/// Returns error if directory listing fails. Individual deletion failures are logged but don't stop cleanup.
pub fn sweep_stale_audio(dir: &Path, max_age: Duration) -> Result<usize> {
    if !dir.exists() {
        tracing::debug!(dir = %dir.display(), "scratch directory does not exist, skipping sweep");
        return Ok(0);
    }

    let now = SystemTime::now();
    let stale: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("failed to read scratch directory {}", dir.display()))?
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| {
            let path = entry.path();
            if !is_job_dir_name(path.file_name()?.to_str()?) {
                return None;
            }

            // Symlinks are not followed
            let metadata = fs::symlink_metadata(&path).ok()?;
            if !metadata.is_dir() {
                return None;
            }

            // Future mtimes (clock skew) count as fresh
            let age = now.duration_since(metadata.modified().ok()?).ok()?;
            (age > max_age).then_some(path)
        })
        .collect();

    let mut deleted_count = 0;
    for path in &stale {
        match fs::remove_dir_all(path) {
            Ok(()) => {
                deleted_count += 1;
                tracing::debug!("deleted stale audio: {}", path.display());
            }
            Err(e) => {
                tracing::warn!("failed to delete {}: {}", path.display(), e);
            }
        }
    }

    if deleted_count > 0 {
        tracing::info!(
            dir = %dir.display(),
            deleted = deleted_count,
            "swept stale audio directories"
        );
    }

    Ok(deleted_count)
}
