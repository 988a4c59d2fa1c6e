//! Streaming the finished video back to the client.
//!
//! The response body owns the `JobOutput`, so the job workspace lives
//! exactly as long as the transfer: it is released when the stream ends,
//! fails, or is dropped because the client went away.

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::http::{header, StatusCode};
use axum::response::Response;
use futures_util::Stream;
use thiserror::Error;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use vstitch_models::JobState;
use vstitch_worker::{CleanupReport, JobOutput};

use crate::error::ApiResult;

/// Failures while handing the result to the client. Logged, never retried.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to open result file: {0}")]
    Open(#[source] std::io::Error),

    #[error("Failed while streaming result after {sent} bytes: {source}")]
    Stream {
        sent: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Client disconnected after {sent} bytes")]
    Aborted { sent: u64 },

    #[error("Failed to build response: {0}")]
    Response(String),
}

/// Respond with the job's output as a `video/mp4` attachment.
pub async fn attachment(output: JobOutput) -> ApiResult<Response> {
    let file = match File::open(output.path()).await {
        Ok(file) => file,
        Err(e) => {
            let err = DeliveryError::Open(e);
            output
                .logger()
                .log_failure(JobState::Delivering, &err.to_string(), None);
            return Err(err.into());
        }
    };
    let length = file.metadata().await.ok().map(|m| m.len());
    let disposition = format!("attachment; filename=\"{}\"", output.filename);

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_DISPOSITION, disposition);
    if let Some(length) = length {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }

    builder
        .body(Body::from_stream(DeliveryStream::new(output, file)))
        .map_err(|e| DeliveryError::Response(e.to_string()).into())
}

/// File stream that releases the job workspace once it is done.
pub struct DeliveryStream {
    inner: ReaderStream<File>,
    output: Option<JobOutput>,
    sent: u64,
}

impl DeliveryStream {
    pub fn new(output: JobOutput, file: File) -> Self {
        Self {
            inner: ReaderStream::new(file),
            output: Some(output),
            sent: 0,
        }
    }

    fn finish(&mut self, error: Option<DeliveryError>) {
        let Some(output) = self.output.take() else {
            return;
        };

        match error {
            Some(err) => {
                output
                    .logger()
                    .log_failure(JobState::Delivering, &err.to_string(), None);
            }
            None => debug!(
                job_id = %output.job_id,
                bytes = self.sent,
                "Delivered {}",
                output.filename
            ),
        }

        // Deletion runs off the poll path; without a runtime it blocks instead
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    warn_leftovers(output.cleanup().await);
                });
            }
            Err(_) => warn_leftovers(output.release()),
        }
    }
}

fn warn_leftovers(report: CleanupReport) {
    if report.failures > 0 {
        warn!("Cleanup after delivery left {} artifacts behind", report.failures);
    }
}

impl Stream for DeliveryStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.sent += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                let err = DeliveryError::Stream {
                    sent: this.sent,
                    source: std::io::Error::new(e.kind(), e.to_string()),
                };
                this.finish(Some(err));
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finish(None);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for DeliveryStream {
    fn drop(&mut self) {
        if self.output.is_some() {
            let sent = self.sent;
            self.finish(Some(DeliveryError::Aborted { sent }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::sync::Arc;
    use tempfile::TempDir;
    use vstitch_media::testing::ScriptedRunner;
    use vstitch_models::{AssetKind, JobRequest, LocalAsset, VideoSource};
    use vstitch_storage::{AssetFetcher, FetchResult};
    use vstitch_worker::{JobOrchestrator, WorkerConfig};

    struct LocalFetcher;

    #[async_trait::async_trait]
    impl AssetFetcher for LocalFetcher {
        async fn fetch(
            &self,
            source_url: &str,
            destination: &std::path::Path,
            kind: AssetKind,
        ) -> FetchResult<LocalAsset> {
            tokio::fs::write(destination, b"clip").await?;
            Ok(LocalAsset {
                source_url: source_url.to_string(),
                local_path: destination.to_path_buf(),
                kind,
            })
        }
    }

    async fn merged_output(base: &TempDir) -> JobOutput {
        let config = WorkerConfig {
            work_dir: base.path().to_path_buf(),
            ..WorkerConfig::default()
        };
        let orchestrator = JobOrchestrator::new(
            config,
            Arc::new(LocalFetcher),
            Arc::new(ScriptedRunner::new()),
        );
        let videos = vec![VideoSource {
            index: 1,
            url: "https://cdn.test/a.mp4".to_string(),
        }];
        orchestrator.run(JobRequest::Merge(videos)).await.unwrap()
    }

    async fn wait_until_removed(root: &std::path::Path) {
        for _ in 0..200 {
            if !root.exists() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("{} still exists", root.display());
    }

    #[tokio::test]
    async fn test_stream_releases_workspace_when_finished() {
        let base = TempDir::new().unwrap();
        let output = merged_output(&base).await;
        let root = output.workspace().root().to_path_buf();
        let file = File::open(output.path()).await.unwrap();

        let mut stream = DeliveryStream::new(output, file);
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk.unwrap());
        }

        assert_eq!(body, b"scripted media");
        wait_until_removed(&root).await;
    }

    #[tokio::test]
    async fn test_dropped_stream_releases_workspace() {
        let base = TempDir::new().unwrap();
        let output = merged_output(&base).await;
        let root = output.workspace().root().to_path_buf();
        let file = File::open(output.path()).await.unwrap();

        drop(DeliveryStream::new(output, file));
        wait_until_removed(&root).await;
    }

    #[test]
    fn test_release_without_runtime_is_immediate() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let base = TempDir::new().unwrap();
        let (output, file) = runtime.block_on(async {
            let output = merged_output(&base).await;
            let file = File::open(output.path()).await.unwrap();
            (output, file)
        });
        let root = output.workspace().root().to_path_buf();
        let stream = DeliveryStream::new(output, file);

        // Dropped outside any runtime context
        drop(stream);
        assert!(!root.exists());
        drop(runtime);
    }
}
