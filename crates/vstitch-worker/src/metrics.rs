//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; they are no-ops unless the
//! binary installs a recorder.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_TOTAL: &str = "vstitch_jobs_total";
    pub const JOB_FAILURES_TOTAL: &str = "vstitch_job_failures_total";
    pub const STAGE_DURATION_SECONDS: &str = "vstitch_stage_duration_seconds";
    pub const ASSETS_FETCHED_TOTAL: &str = "vstitch_assets_fetched_total";
    pub const CLEANUP_FAILURES_TOTAL: &str = "vstitch_cleanup_failures_total";
}

/// Record the terminal outcome of a job.
pub fn record_job(kind: &str, outcome: &str) {
    let labels = [("kind", kind.to_string()), ("outcome", outcome.to_string())];
    counter!(names::JOBS_TOTAL, &labels).increment(1);
}

/// Record which stage a failed job broke in.
pub fn record_job_failure(kind: &str, stage: &str) {
    let labels = [("kind", kind.to_string()), ("stage", stage.to_string())];
    counter!(names::JOB_FAILURES_TOTAL, &labels).increment(1);
}

/// Record how long a stage took.
pub fn record_stage_duration(stage: &str, duration_secs: f64) {
    let labels = [("stage", stage.to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_assets_fetched(count: usize) {
    counter!(names::ASSETS_FETCHED_TOTAL).increment(count as u64);
}

pub fn record_cleanup_failures(count: usize) {
    counter!(names::CLEANUP_FAILURES_TOTAL).increment(count as u64);
}
