//! Application state.

use std::sync::Arc;

use vstitch_media::{CommandRunner, ProcessRunner};
use vstitch_storage::{HttpFetcher, StorageConfig};
use vstitch_worker::{JobOrchestrator, WorkerConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: Arc<JobOrchestrator>,
}

impl AppState {
    /// Create new application state.
    ///
    /// Loads asset-store credentials once; configured-but-unusable
    /// credentials are an error.
    pub async fn new(
        config: ApiConfig,
        worker: WorkerConfig,
        storage: StorageConfig,
    ) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::from_config(&storage).await?;

        let mut runner = ProcessRunner::new();
        if let Some(secs) = worker.command_timeout_secs {
            runner = runner.with_timeout(secs);
        }
        let runner: Arc<dyn CommandRunner> = Arc::new(runner);

        let orchestrator = JobOrchestrator::new(worker, Arc::new(fetcher), runner);
        Ok(Self::with_orchestrator(config, orchestrator))
    }

    /// State around an already-built orchestrator.
    pub fn with_orchestrator(config: ApiConfig, orchestrator: JobOrchestrator) -> Self {
        Self {
            config,
            orchestrator: Arc::new(orchestrator),
        }
    }
}
