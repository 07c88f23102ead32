use super::engine::{DecodeOptions, Transcriber, TranscriptionEngine};
use super::weights::ensure_model_downloaded;
use crate::config::{Config, ModelConfig};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

/// Builds the shared transcriber; runs on the blocking pool
type Loader = dyn Fn() -> anyhow::Result<Arc<dyn Transcriber>> + Send + Sync;

/// Model could not be brought up; no job can be served until it is
#[derive(Debug, Error)]
pub enum ModelInitError {
    /// Loader returned an error (missing weights, no device, ...)
    #[error("model initialization failed: {0:#}")]
    Load(anyhow::Error),

    /// Loader panicked or was cancelled
    #[error("model initialization aborted: {0}")]
    Aborted(String),
}

/// Process-wide, lazily initialized transcriber
///
/// The first `ensure_ready` call runs the loader; concurrent callers wait on
/// that single attempt and share its result. A failed attempt leaves the
/// cell empty, so the next call tries again.
pub struct ModelCell {
    cell: OnceCell<Arc<dyn Transcriber>>,
    loader: Arc<Loader>,
}

impl ModelCell {
    /// Creates an empty cell that will initialize with `loader`
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> anyhow::Result<Arc<dyn Transcriber>> + Send + Sync + 'static,
    {
        Self {
            cell: OnceCell::new(),
            loader: Arc::new(loader),
        }
    }

    /// Cell that downloads ggml weights if needed and loads them into whisper
    #[must_use]
    pub fn whisper(config: &ModelConfig) -> Self {
        let config = config.clone();
        Self::new(move || {
            let path = Config::expand_path(&config.path)?;
            ensure_model_downloaded(&config.name, &path)?;
            let engine =
                TranscriptionEngine::new(&path, DecodeOptions::from(&config), config.use_gpu)?;
            Ok(Arc::new(engine) as Arc<dyn Transcriber>)
        })
    }

    /// Whether initialization has completed
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.cell.initialized()
    }

    /// Returns the shared transcriber, initializing it on first use
    ///
    /// # Errors
    /// Returns error if this call's initialization attempt fails
    pub async fn ensure_ready(&self) -> Result<Arc<dyn Transcriber>, ModelInitError> {
        let result = self
            .cell
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                let start = std::time::Instant::now();
                tracing::info!("initializing transcription model");

                let model = tokio::task::spawn_blocking(move || loader())
                    .await
                    .map_err(|e| ModelInitError::Aborted(e.to_string()))?
                    .map_err(ModelInitError::Load)?;

                tracing::info!(
                    init_ms = start.elapsed().as_millis(),
                    "transcription model ready"
                );
                Ok::<_, ModelInitError>(model)
            })
            .await;

        match result {
            Ok(model) => Ok(Arc::clone(model)),
            Err(e) => {
                tracing::error!(error = %e, "transcription model unavailable");
                Err(e)
            }
        }
    }
}
