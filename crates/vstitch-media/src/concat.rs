//! Concat-demuxer assembly of ordered segments.

use std::path::{Path, PathBuf};
use tracing::info;

use vstitch_models::EncodingPolicy;

use crate::command::{CommandRunner, FfmpegCommand};
use crate::error::{MediaError, MediaResult};

/// How segments are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatMode {
    /// Stream copy; inputs must share codec parameters
    Copy,
    /// Full re-encode; safe for clips from independent sources
    Reencode,
}

impl ConcatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConcatMode::Copy => "copy",
            ConcatMode::Reencode => "reencode",
        }
    }
}

/// Quote a path for a concat manifest line.
///
/// The demuxer reads `'...'` with `'\''` standing for a literal quote, same as a POSIX shell.
fn quote_manifest_path(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

/// Render the manifest listing `segments` in order.
pub fn render_manifest(segments: &[PathBuf]) -> String {
    segments
        .iter()
        .map(|p| format!("file {}\n", quote_manifest_path(p)))
        .collect()
}

/// Every segment must exist and be non-empty.
async fn verify_segments(segments: &[PathBuf]) -> MediaResult<()> {
    if segments.is_empty() {
        return Err(MediaError::invalid_input("no segments to assemble"));
    }

    for segment in segments {
        let metadata = tokio::fs::metadata(segment)
            .await
            .map_err(|_| MediaError::FileNotFound(segment.clone()))?;
        if metadata.len() == 0 {
            return Err(MediaError::invalid_input(format!(
                "segment {} is empty",
                segment.display()
            )));
        }
    }

    Ok(())
}

/// Build the concat command for `manifest`.
pub fn concat_command(
    manifest: &Path,
    output: &Path,
    mode: ConcatMode,
    policy: &EncodingPolicy,
) -> FfmpegCommand {
    match mode {
        ConcatMode::Copy => FfmpegCommand::new(output)
            .input_with(["-f", "concat", "-safe", "0"], manifest)
            .codec_copy()
            .faststart(),
        ConcatMode::Reencode => FfmpegCommand::new(output)
            // Regenerate timestamps so clips authored independently line up
            .input_with(["-fflags", "+genpts", "-f", "concat", "-safe", "0"], manifest)
            .encoding(policy)
            // Pad/stretch audio to the video clock across clip boundaries
            .audio_filter("aresample=async=1:first_pts=0")
            .faststart(),
    }
}

/// Concatenate `segments` in order into `output`.
///
/// The manifest is written to `manifest`; the caller owns its cleanup.
pub async fn assemble(
    runner: &dyn CommandRunner,
    segments: &[PathBuf],
    manifest: impl AsRef<Path>,
    output: impl AsRef<Path>,
    mode: ConcatMode,
    policy: &EncodingPolicy,
) -> MediaResult<()> {
    let manifest = manifest.as_ref();
    let output = output.as_ref();

    verify_segments(segments).await?;
    tokio::fs::write(manifest, render_manifest(segments)).await?;

    info!(
        segments = segments.len(),
        mode = mode.as_str(),
        "Assembling {}",
        output.display()
    );

    runner
        .run(&concat_command(manifest, output, mode, policy).invocation())
        .await?;

    Ok(())
}
