//! FFprobe duration probing.

use std::path::Path;

use crate::command::{CommandInvocation, CommandRunner};
use crate::error::{MediaError, MediaResult};

/// FFprobe invocation printing only the container duration in seconds.
pub fn duration_probe(path: impl AsRef<Path>) -> CommandInvocation {
    CommandInvocation::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path.as_ref().to_string_lossy())
}

/// Get video duration in seconds.
pub async fn probe_duration(runner: &dyn CommandRunner, path: impl AsRef<Path>) -> MediaResult<f64> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let output = runner.run(&duration_probe(path)).await?;
    parse_duration(&output)
}

/// Parse the single number printed by [`duration_probe`].
///
/// Empty output, `N/A`, extra tokens, or a negative or non-finite value are all rejected.
pub fn parse_duration(output: &str) -> MediaResult<f64> {
    let mut lines = output.lines().map(str::trim).filter(|l| !l.is_empty());

    let value = match (lines.next(), lines.next()) {
        (Some(value), None) => value,
        _ => return Err(MediaError::InvalidProbeOutput(output.to_string())),
    };

    match value.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok(secs),
        _ => Err(MediaError::InvalidProbeOutput(output.to_string())),
    }
}
