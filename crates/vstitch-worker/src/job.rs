//! A single pipeline run and its deliverable.

use std::path::{Path, PathBuf};
use std::time::Instant;

use vstitch_models::{JobId, JobKind, JobState};

use crate::error::{JobError, JobResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::workspace::{CleanupReport, JobWorkspace};

/// Lifecycle tracker for one request.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    kind: JobKind,
    state: JobState,
    logger: JobLogger,
    started_at: Instant,
    stage_started_at: Instant,
}

impl Job {
    pub fn new(kind: JobKind) -> Self {
        let id = JobId::new();
        let logger = JobLogger::new(&id, kind);
        let now = Instant::now();
        Self {
            id,
            kind,
            state: JobState::Validating,
            logger,
            started_at: now,
            stage_started_at: now,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn logger(&self) -> &JobLogger {
        &self.logger
    }

    /// Move to `next`, recording how long the current stage took.
    pub fn advance(&mut self, next: JobState) -> JobResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(JobError::internal(format!(
                "invalid job transition {} -> {}",
                self.state, next
            )));
        }

        self.close_stage();
        self.logger.log_transition(self.state, next);
        self.state = next;
        Ok(())
    }

    /// Mark the job failed. Has no effect on a job that already ended.
    pub fn fail(&mut self, err: &JobError) {
        if self.state.is_terminal() {
            return;
        }

        self.logger
            .log_failure(self.state, &err.to_string(), err.process_output());
        self.close_stage();
        self.state = JobState::Failed;

        let outcome = if err.is_validation() { "rejected" } else { "failed" };
        metrics::record_job(self.kind.as_str(), outcome);
        metrics::record_job_failure(self.kind.as_str(), err.stage());
    }

    /// Hand the finished file over together with the workspace that owns it.
    pub fn deliver(mut self, path: PathBuf, workspace: JobWorkspace) -> JobResult<JobOutput> {
        self.advance(JobState::Delivering)?;
        metrics::record_job(self.kind.as_str(), "succeeded");
        self.logger.log_completion(&format!(
            "{} ready after {:.2}s",
            path.display(),
            self.started_at.elapsed().as_secs_f64()
        ));

        Ok(JobOutput {
            job_id: self.id,
            kind: self.kind,
            filename: self.kind.output_name().to_string(),
            path,
            logger: self.logger,
            workspace,
        })
    }

    fn close_stage(&mut self) {
        let now = Instant::now();
        metrics::record_stage_duration(
            self.state.as_str(),
            now.duration_since(self.stage_started_at).as_secs_f64(),
        );
        self.stage_started_at = now;
    }
}

/// Finished video awaiting delivery.
///
/// Owns the job's workspace: the file stays on disk while this value is
/// alive and every artifact is deleted when it is released or dropped.
#[derive(Debug)]
pub struct JobOutput {
    pub job_id: JobId,
    pub kind: JobKind,
    /// Attachment name presented to the client
    pub filename: String,
    path: PathBuf,
    logger: JobLogger,
    workspace: JobWorkspace,
}

impl JobOutput {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn logger(&self) -> &JobLogger {
        &self.logger
    }

    pub fn workspace(&self) -> &JobWorkspace {
        &self.workspace
    }

    /// Delete every artifact of the job. Blocks on the filesystem.
    pub fn release(self) -> CleanupReport {
        let report = self.workspace.release();
        self.log_cleanup(report);
        report
    }

    /// Async variant of [`release`](Self::release).
    pub async fn cleanup(self) -> CleanupReport {
        let report = self.workspace.cleanup().await;
        self.log_cleanup(report);
        report
    }

    fn log_cleanup(&self, report: CleanupReport) {
        self.logger.log_transition(JobState::Delivering, JobState::Cleanup);
        if report.failures > 0 {
            self.logger
                .log_warning(&format!("{} artifacts could not be deleted", report.failures));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_rejects_backwards_moves() {
        let mut job = Job::new(JobKind::Sequence);
        job.advance(JobState::Fetching).unwrap();
        job.advance(JobState::Synthesizing).unwrap();

        let err = job.advance(JobState::Fetching).unwrap_err();
        assert!(matches!(err, JobError::Internal(_)));
        assert_eq!(job.state(), JobState::Synthesizing);
    }

    #[test]
    fn test_fail_is_terminal() {
        let mut job = Job::new(JobKind::Single);
        job.advance(JobState::Fetching).unwrap();
        job.fail(&JobError::internal("boom"));

        assert_eq!(job.state(), JobState::Failed);
        assert!(job.advance(JobState::Synthesizing).is_err());
    }

    #[tokio::test]
    async fn test_output_cleanup_removes_workspace() {
        let base = tempfile::TempDir::new().unwrap();
        let mut job = Job::new(JobKind::Merge);
        let workspace = JobWorkspace::create(base.path(), job.id()).await.unwrap();
        let path = workspace.artifact("merged.mp4");
        tokio::fs::write(&path, b"video").await.unwrap();
        let root = workspace.root().to_path_buf();

        job.advance(JobState::Fetching).unwrap();
        job.advance(JobState::Assembling).unwrap();
        let output = job.deliver(path, workspace).unwrap();
        let report = output.cleanup().await;

        assert_eq!(report, CleanupReport { removed: 1, failures: 0 });
        assert!(!root.exists());
    }
}
