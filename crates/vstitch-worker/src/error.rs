//! Job error types.

use thiserror::Error;

use vstitch_media::MediaError;
use vstitch_models::ValidationError;
use vstitch_storage::FetchError;

pub type JobResult<T> = Result<T, JobError>;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Synthesis of segment {index} failed: {source}")]
    Synthesis {
        index: u32,
        #[source]
        source: MediaError,
    },

    #[error("Assembly failed: {0}")]
    Assemble(#[source] MediaError),

    #[error("Trim failed: {0}")]
    Trim(#[source] MediaError),

    #[error("Workspace error: {0}")]
    Workspace(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl JobError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Client error (bad request) rather than a pipeline failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, JobError::Validation(_))
    }

    /// Stage label for logs and metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            JobError::Validation(_) => "validating",
            JobError::Fetch(_) => "fetching",
            JobError::Synthesis { .. } => "synthesizing",
            JobError::Assemble(_) => "assembling",
            JobError::Trim(_) => "trimming",
            JobError::Workspace(_) | JobError::Internal(_) => "internal",
        }
    }

    /// Combined FFmpeg/FFprobe output, when a process failed.
    pub fn process_output(&self) -> Option<&str> {
        match self {
            JobError::Synthesis { source, .. } => source.process_output(),
            JobError::Assemble(e) | JobError::Trim(e) => e.process_output(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels() {
        let err = JobError::Synthesis {
            index: 2,
            source: MediaError::command_failed("ffmpeg", Some(1), "bad input"),
        };
        assert_eq!(err.stage(), "synthesizing");
        assert_eq!(err.process_output(), Some("bad input"));
        assert_eq!(
            err.to_string(),
            "Synthesis of segment 2 failed: ffmpeg failed: bad input"
        );
        assert!(!err.is_validation());
    }

    #[test]
    fn test_validation_is_client_error() {
        let err = JobError::from(ValidationError::other("nope"));
        assert!(err.is_validation());
        assert!(err.process_output().is_none());
    }
}
