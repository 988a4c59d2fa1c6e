//! Still image + audio track → video segment.

use std::path::Path;
use tracing::info;

use vstitch_models::EncodingPolicy;

use crate::command::{CommandRunner, FfmpegCommand};
use crate::error::{MediaError, MediaResult};

/// Build the synthesis command.
///
/// The image is looped forever and `-shortest` stops the output when the
/// audio ends, so the segment is exactly as long as its audio track.
pub fn synthesis_command(
    image: &Path,
    audio: &Path,
    output: &Path,
    policy: &EncodingPolicy,
) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .input_with(["-loop", "1"], image)
        .input(audio)
        .video_codec(&policy.video_codec)
        .audio_codec(&policy.audio_codec)
        .audio_bitrate(&policy.audio_bitrate)
        .shortest()
        .pixel_format(&policy.pixel_format)
}

/// Synthesize one segment from a still image and an audio track.
pub async fn synthesize_segment(
    runner: &dyn CommandRunner,
    image: impl AsRef<Path>,
    audio: impl AsRef<Path>,
    output: impl AsRef<Path>,
    policy: &EncodingPolicy,
) -> MediaResult<()> {
    let image = image.as_ref();
    let audio = audio.as_ref();
    let output = output.as_ref();

    for input in [image, audio] {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }
    }

    info!(
        "Synthesizing segment: {} + {} -> {}",
        image.display(),
        audio.display(),
        output.display()
    );

    runner
        .run(&synthesis_command(image, audio, output, policy).invocation())
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;
    use tempfile::TempDir;

    #[test]
    fn test_synthesis_args() {
        let args = synthesis_command(
            Path::new("image1.png"),
            Path::new("audio1.mp3"),
            Path::new("segment1.mp4"),
            &EncodingPolicy::default(),
        )
        .build_args();

        let joined = args.join(" ");
        assert!(joined.contains("-loop 1 -i image1.png -i audio1.mp3"));
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-c:a aac -b:a 192k"));
        assert!(joined.contains("-shortest"));
        assert!(joined.contains("-pix_fmt yuv420p"));
        assert_eq!(args.last().unwrap(), "segment1.mp4");
    }

    #[tokio::test]
    async fn test_missing_input_fails_before_running() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("image1.png");
        std::fs::write(&image, b"png").unwrap();
        let runner = ScriptedRunner::new();

        let err = synthesize_segment(
            &runner,
            &image,
            dir.path().join("audio1.mp3"),
            dir.path().join("segment1.mp4"),
            &EncodingPolicy::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MediaError::FileNotFound(_)));
        assert!(runner.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_synthesize_runs_ffmpeg() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("image1.png");
        let audio = dir.path().join("audio1.mp3");
        let output = dir.path().join("segment1.mp4");
        std::fs::write(&image, b"png").unwrap();
        std::fs::write(&audio, b"mp3").unwrap();
        let runner = ScriptedRunner::new();

        synthesize_segment(&runner, &image, &audio, &output, &EncodingPolicy::default())
            .await
            .unwrap();

        assert!(output.exists());
        assert_eq!(runner.invocations().len(), 1);
    }
}
