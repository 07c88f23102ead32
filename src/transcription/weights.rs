use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Download URL of the ggml weights for `model_name`
fn model_url(model_name: &str) -> String {
    format!("{MODEL_BASE_URL}/ggml-{model_name}.bin")
}

/// Ensures the weights exist at `model_path`; returns true if they were downloaded
///
/// Blocking; call from the blocking pool.
///
/// # Errors
/// Returns error if the download or the write fails
pub fn ensure_model_downloaded(model_name: &str, model_path: &Path) -> Result<bool> {
    if model_path.exists() {
        tracing::info!(
            path = %model_path.display(),
            "model already exists, skipping download"
        );
        return Ok(false);
    }

    tracing::info!(
        model = model_name,
        path = %model_path.display(),
        "model not found, starting download"
    );

    download_model(&model_url(model_name), model_path)?;

    Ok(true)
}

fn download_model(url: &str, model_path: &Path) -> Result<()> {
    let parent = model_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).context("failed to create model directory")?;

    tracing::info!(url = %url, "downloading model");

    let response = reqwest::blocking::get(url)
        .with_context(|| format!("failed to download model from {url}"))?;

    if !response.status().is_success() {
        anyhow::bail!("download failed with status {}: {}", response.status(), url);
    }

    let bytes = response.bytes().context("failed to read response bytes")?;

    // Written next to the target so the rename stays on one filesystem;
    // removed automatically if anything below fails
    let mut temp = tempfile::Builder::new()
        .prefix(".ggml-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    temp.write_all(&bytes)
        .context("failed to write model to temp file")?;
    temp.persist(model_path)
        .with_context(|| format!("failed to move model into {}", model_path.display()))?;

    tracing::info!(
        path = %model_path.display(),
        size = bytes.len(),
        "model downloaded successfully"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_url() {
        assert_eq!(
            model_url("small"),
            "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-small.bin"
        );
        assert!(model_url("large-v3").ends_with("/ggml-large-v3.bin"));
    }

    #[test]
    fn test_ensure_model_downloaded_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("ggml-small.bin");
        fs::write(&model_path, b"dummy model data").unwrap();

        let downloaded = ensure_model_downloaded("small", &model_path).unwrap();

        assert!(!downloaded);
        assert_eq!(fs::read(&model_path).unwrap(), b"dummy model data");
    }

    #[test]
    #[ignore = "requires network access"]
    fn test_download_invalid_model() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("nested").join("ggml-nonexistent.bin");

        let result = ensure_model_downloaded("nonexistent-model-xyz", &model_path);

        assert!(result.is_err());
        assert!(!model_path.exists());
        let leftovers = fs::read_dir(model_path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    #[ignore = "requires network access and downloads a 75MB file"]
    fn test_download_model_integration() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("ggml-tiny.bin");

        let downloaded = ensure_model_downloaded("tiny", &model_path).unwrap();

        assert!(downloaded);
        assert!(fs::metadata(&model_path).unwrap().len() > 0);
    }
}
