//! Per-job working directory with guaranteed cleanup.
//!
//! Every artifact a job creates lives under `<work_dir>/<job_id>/` and is
//! registered here before it is written. Dropping the workspace deletes
//! them all, which covers success, failure, panics and requests abandoned
//! mid-flight. Deletion problems are logged and counted, never returned.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::{debug, warn};
use vstitch_models::JobId;

use crate::metrics;

/// Result of releasing a workspace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Registered files deleted
    pub removed: usize,
    /// Deletions that failed for a reason other than "already gone"
    pub failures: usize,
}

/// Scoped owner of a job's temporary files.
#[derive(Debug)]
pub struct JobWorkspace {
    job_id: JobId,
    root: PathBuf,
    artifacts: Mutex<Vec<PathBuf>>,
    released: AtomicBool,
}

impl JobWorkspace {
    /// Create `<base>/<job_id>/`.
    pub async fn create(base: &Path, job_id: &JobId) -> std::io::Result<Self> {
        let root = base.join(job_id.as_str());
        tokio::fs::create_dir_all(&root).await?;

        Ok(Self {
            job_id: job_id.clone(),
            root,
            artifacts: Mutex::new(Vec::new()),
            released: AtomicBool::new(false),
        })
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Register and return the path of artifact `name` inside this workspace.
    pub fn artifact(&self, name: impl AsRef<str>) -> PathBuf {
        let path = self.root.join(name.as_ref());
        if let Ok(mut artifacts) = self.artifacts.lock() {
            artifacts.push(path.clone());
        }
        path
    }

    /// Registered artifact paths, in registration order.
    pub fn artifacts(&self) -> Vec<PathBuf> {
        self.artifacts
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    /// Delete every artifact and the job directory. Idempotent.
    ///
    /// Blocking; used from `Drop`. Async callers should use [`cleanup`](Self::cleanup).
    pub fn release(&self) -> CleanupReport {
        if self.released.swap(true, Ordering::SeqCst) {
            return CleanupReport::default();
        }

        let mut report = CleanupReport::default();
        for path in self.artifacts() {
            self.tally(&mut report, &path, std::fs::remove_file(&path));
        }
        // Catches anything the transcoder left behind that was never registered
        self.tally_dir(&mut report, std::fs::remove_dir_all(&self.root));

        self.finish(report)
    }

    /// Same as [`release`](Self::release), without blocking the runtime.
    pub async fn cleanup(&self) -> CleanupReport {
        if self.released.swap(true, Ordering::SeqCst) {
            return CleanupReport::default();
        }

        let mut report = CleanupReport::default();
        for path in self.artifacts() {
            let result = tokio::fs::remove_file(&path).await;
            self.tally(&mut report, &path, result);
        }
        let result = tokio::fs::remove_dir_all(&self.root).await;
        self.tally_dir(&mut report, result);

        self.finish(report)
    }

    fn tally(&self, report: &mut CleanupReport, path: &Path, result: std::io::Result<()>) {
        match result {
            Ok(()) => report.removed += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(job_id = %self.job_id, "Failed to delete {}: {}", path.display(), e);
                report.failures += 1;
            }
        }
    }

    fn tally_dir(&self, report: &mut CleanupReport, result: std::io::Result<()>) {
        match result {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(
                    job_id = %self.job_id,
                    "Failed to delete job directory {}: {}",
                    self.root.display(),
                    e
                );
                report.failures += 1;
            }
        }
    }

    fn finish(&self, report: CleanupReport) -> CleanupReport {
        if report.failures > 0 {
            metrics::record_cleanup_failures(report.failures);
        }
        debug!(
            job_id = %self.job_id,
            removed = report.removed,
            failures = report.failures,
            "Job workspace released"
        );
        report
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_release_removes_artifacts_and_directory() {
        let base = TempDir::new().unwrap();
        let ws = JobWorkspace::create(base.path(), &JobId::new()).await.unwrap();

        let a = ws.artifact("image1.png");
        let b = ws.artifact("audio1.mp3");
        let _never_written = ws.artifact("segment1.mp4");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();
        std::fs::write(ws.root().join("stray.log"), b"x").unwrap();

        let report = ws.release();

        assert_eq!(report, CleanupReport { removed: 2, failures: 0 });
        assert!(!ws.root().exists());
        assert_eq!(ws.release(), CleanupReport::default());
    }

    #[tokio::test]
    async fn test_async_cleanup_matches_release() {
        let base = TempDir::new().unwrap();
        let ws = JobWorkspace::create(base.path(), &JobId::new()).await.unwrap();
        tokio::fs::write(ws.artifact("segment1.mp4"), b"s").await.unwrap();
        let _missing = ws.artifact("segment2.mp4");

        let report = ws.cleanup().await;

        assert_eq!(report, CleanupReport { removed: 1, failures: 0 });
        assert!(!ws.root().exists());
        // Already released: neither path touches the disk again
        assert_eq!(ws.release(), CleanupReport::default());
        assert_eq!(ws.cleanup().await, CleanupReport::default());
    }

    #[tokio::test]
    async fn test_drop_cleans_up() {
        let base = TempDir::new().unwrap();
        let root = {
            let ws = JobWorkspace::create(base.path(), &JobId::new()).await.unwrap();
            std::fs::write(ws.artifact("final_video.mp4"), b"v").unwrap();
            ws.root().to_path_buf()
        };
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_workspaces_are_namespaced_per_job() {
        let base = TempDir::new().unwrap();
        let one = JobWorkspace::create(base.path(), &JobId::new()).await.unwrap();
        let two = JobWorkspace::create(base.path(), &JobId::new()).await.unwrap();

        assert_ne!(one.artifact("concat.txt"), two.artifact("concat.txt"));
    }
}
