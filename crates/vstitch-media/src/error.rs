//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("{program} failed: {message}")]
    CommandFailed {
        program: String,
        message: String,
        /// Combined stdout + stderr of the process
        output: String,
        exit_code: Option<i32>,
    },

    #[error("Failed to launch {program}: {source}")]
    LaunchFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected probe output: {0:?}")]
    InvalidProbeOutput(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create a command failure from the process exit code and its combined output.
    ///
    /// The display message is the last non-empty output line, which for
    /// FFmpeg at `-loglevel error` is the actual cause.
    pub fn command_failed(
        program: impl Into<String>,
        exit_code: Option<i32>,
        output: impl Into<String>,
    ) -> Self {
        let output = output.into();
        let message = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(String::from)
            .unwrap_or_else(|| match exit_code {
                Some(code) => format!("exited with status {}", code),
                None => "terminated by signal".to_string(),
            });

        Self::CommandFailed {
            program: program.into(),
            message,
            output,
            exit_code,
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Full process output, when the error came from a process.
    pub fn process_output(&self) -> Option<&str> {
        match self {
            MediaError::CommandFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_uses_last_output_line() {
        let err = MediaError::command_failed(
            "ffmpeg",
            Some(1),
            "some warning\nimage1.png: No such file or directory\n\n",
        );
        assert_eq!(
            err.to_string(),
            "ffmpeg failed: image1.png: No such file or directory"
        );
        assert!(err.process_output().unwrap().contains("some warning"));
    }

    #[test]
    fn test_command_failed_without_output() {
        let err = MediaError::command_failed("ffprobe", Some(3), "");
        assert_eq!(err.to_string(), "ffprobe failed: exited with status 3");

        let err = MediaError::command_failed("ffmpeg", None, "   ");
        assert!(err.to_string().contains("signal"));
    }
}
