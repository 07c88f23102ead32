use anyhow::Result;
use std::sync::Arc;
use tokio::io::BufReader;
use transcribe_worker::config::Config;
use transcribe_worker::{cleanup, telemetry, worker, JobHandler};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    telemetry::init(&config.telemetry)?;
    tracing::info!(
        model = %config.model.name,
        concurrency = config.worker.concurrency,
        "transcribe-worker starting"
    );

    if let Some(max_age) = config.worker.stale_audio_max_age() {
        if let Err(e) = cleanup::sweep_stale_audio(&config.tools.temp_dir, max_age) {
            tracing::warn!(error = %e, "stale audio sweep failed");
        }
    }

    // Model loads on the first job, not here
    let handler = Arc::new(JobHandler::from_config(&config));

    let stdin = BufReader::new(tokio::io::stdin());
    let (_, processed) = worker::serve(
        handler,
        stdin,
        tokio::io::stdout(),
        config.worker.concurrency,
    )
    .await?;

    tracing::info!(processed = processed, "input closed, shutting down");
    Ok(())
}
