//! Job identity and lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::encoding::{MERGE_OUTPUT_NAME, SEQUENCE_OUTPUT_NAME, SINGLE_OUTPUT_NAME};

/// Unique identifier for a job.
///
/// Also used as the name of the job's private working directory, so two
/// concurrent jobs never write to the same path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which pipeline a request runs through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Many image/audio pairs → segments → stream-copy concat
    Sequence,
    /// One image/audio pair → segment → tail trim
    Single,
    /// Pre-made videos → re-encode concat
    Merge,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Sequence => "sequence",
            JobKind::Single => "single",
            JobKind::Merge => "merge",
        }
    }

    /// File name used for the delivered attachment.
    pub fn output_name(&self) -> &'static str {
        match self {
            JobKind::Sequence => SEQUENCE_OUTPUT_NAME,
            JobKind::Single => SINGLE_OUTPUT_NAME,
            JobKind::Merge => MERGE_OUTPUT_NAME,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage a job is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Validating,
    Fetching,
    Synthesizing,
    Assembling,
    Trimming,
    Delivering,
    /// Terminal: result handed over, artifacts released
    Cleanup,
    /// Terminal: pipeline aborted, artifacts released
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Validating => "validating",
            JobState::Fetching => "fetching",
            JobState::Synthesizing => "synthesizing",
            JobState::Assembling => "assembling",
            JobState::Trimming => "trimming",
            JobState::Delivering => "delivering",
            JobState::Cleanup => "cleanup",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Cleanup | JobState::Failed)
    }

    /// Whether the pipeline may move from `self` to `next`.
    ///
    /// Stages only move forward; skipped stages (synthesis for merges,
    /// assembly for single videos, trimming for everything but single
    /// videos) are allowed. `Failed` is reachable from any non-terminal state.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            JobState::Failed => true,
            JobState::Validating => false,
            _ => next.rank() > self.rank(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            JobState::Validating => 0,
            JobState::Fetching => 1,
            JobState::Synthesizing => 2,
            JobState::Assembling => 3,
            JobState::Trimming => 4,
            JobState::Delivering => 5,
            JobState::Cleanup => 6,
            JobState::Failed => 7,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_ids_are_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn test_output_names() {
        assert_eq!(JobKind::Sequence.output_name(), "final_video.mp4");
        assert_eq!(JobKind::Single.output_name(), "single_video.mp4");
        assert_eq!(JobKind::Merge.output_name(), "final_merged_video.mp4");
    }

    #[test]
    fn test_forward_transitions() {
        assert!(JobState::Validating.can_transition_to(JobState::Fetching));
        assert!(JobState::Fetching.can_transition_to(JobState::Assembling));
        assert!(JobState::Synthesizing.can_transition_to(JobState::Trimming));
        assert!(JobState::Delivering.can_transition_to(JobState::Cleanup));
        assert!(!JobState::Assembling.can_transition_to(JobState::Fetching));
        assert!(!JobState::Fetching.can_transition_to(JobState::Validating));
    }

    #[test]
    fn test_failed_reachable_from_non_terminal_only() {
        assert!(JobState::Validating.can_transition_to(JobState::Failed));
        assert!(JobState::Delivering.can_transition_to(JobState::Failed));
        assert!(!JobState::Cleanup.can_transition_to(JobState::Failed));
        assert!(!JobState::Failed.can_transition_to(JobState::Cleanup));
    }
}
