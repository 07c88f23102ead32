use crate::handler::JobHandler;
use crate::job::{Job, JobResult};
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Semaphore};

/// One line of output: the job id echoed back with its result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobResponse {
    /// Id from the incoming job, if it had one
    pub id: Option<String>,
    /// Handler result
    pub output: JobResult,
}

/// Reads one JSON job per line, runs up to `concurrency` of them at once and
/// writes one JSON response per line in completion order
///
/// Returns the writer and the number of responses written once `reader`
/// hits EOF and every in-flight job has finished. Stops taking jobs as soon
/// as the output side is gone.
///
/// # Errors
/// Returns error if reading input or writing output fails
pub async fn serve<R, W>(
    handler: Arc<JobHandler>,
    reader: R,
    writer: W,
    concurrency: usize,
) -> Result<(W, usize)>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<JobResponse>();
    let writer_task = tokio::spawn(write_responses(rx, writer));
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("failed to read job")? {
        if tx.is_closed() {
            tracing::warn!("response writer stopped, no longer accepting jobs");
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let job: Job = match serde_json::from_str(&line) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(error = %e, "rejecting malformed job");
                let _ = tx.send(JobResponse {
                    id: None,
                    output: JobResult::failure(format!("invalid job: {e}")),
                });
                continue;
            }
        };

        let permit = Arc::clone(&permits)
            .acquire_owned()
            .await
            .context("job semaphore closed")?;
        if tx.is_closed() {
            tracing::warn!("response writer stopped while waiting for a job slot");
            break;
        }
        let handler = Arc::clone(&handler);
        let tx = tx.clone();
        tokio::spawn(async move {
            let output = handler.handle(&job).await;
            drop(permit);
            let _ = tx.send(JobResponse { id: job.id, output });
        });
    }

    // Writer finishes once the last in-flight job drops its sender
    drop(tx);
    writer_task.await.context("response writer panicked")?
}

async fn write_responses<W>(
    mut rx: mpsc::UnboundedReceiver<JobResponse>,
    mut writer: W,
) -> Result<(W, usize)>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_vec(&response).context("failed to encode response")?;
        line.push(b'\n');
        writer
            .write_all(&line)
            .await
            .context("failed to write response")?;
        writer.flush().await.context("failed to flush response")?;
        written += 1;
    }
    Ok((writer, written))
}
