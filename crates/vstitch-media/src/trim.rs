//! Tail trimming by stream copy.
//!
//! The cut is done without re-encoding, so it lands on a keyframe: the
//! result may end slightly earlier than requested.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::command::{CommandRunner, FfmpegCommand};
use crate::error::MediaResult;
use crate::probe::probe_duration;

/// Outcome of a tail trim.
#[derive(Debug, Clone, PartialEq)]
pub enum TrimResult {
    /// Video was not longer than the tail; the input is still the result
    Skipped,
    /// Trimmed video written here; the input has been removed
    Trimmed(PathBuf),
}

/// Duration left after cutting `tail_secs`, or `None` if nothing would remain.
///
/// Rounded to the millisecond precision `-t` is written with, so a value
/// that would be passed as `0.000` counts as nothing left.
pub fn remaining_duration(original_secs: f64, tail_secs: f64) -> Option<f64> {
    let remaining = ((original_secs - tail_secs) * 1000.0).round() / 1000.0;
    (remaining > 0.0).then_some(remaining)
}

/// Stream-copy `[0, duration)` of `input` into `output`.
pub fn trim_command(input: &Path, output: &Path, duration_secs: f64) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .input(input)
        .duration(duration_secs)
        .codec_copy()
}

/// Remove the last `tail_secs` seconds of `input`.
pub async fn trim_tail(
    runner: &dyn CommandRunner,
    input: impl AsRef<Path>,
    tail_secs: f64,
    output: impl AsRef<Path>,
) -> MediaResult<TrimResult> {
    let input = input.as_ref();
    let output = output.as_ref();

    let original = probe_duration(runner, input).await?;

    let Some(remaining) = remaining_duration(original, tail_secs) else {
        info!(
            "Video {} is {:.3}s, not longer than the {:.3}s tail; skipping trim",
            input.display(),
            original,
            tail_secs
        );
        return Ok(TrimResult::Skipped);
    };

    info!(
        "Trimming {} from {:.3}s to {:.3}s -> {}",
        input.display(),
        original,
        remaining,
        output.display()
    );

    runner
        .run(&trim_command(input, output, remaining).invocation())
        .await?;

    if let Err(e) = tokio::fs::remove_file(input).await {
        warn!("Failed to remove untrimmed video {}: {}", input.display(), e);
    }

    Ok(TrimResult::Trimmed(output.to_path_buf()))
}
