//! Encoding policy shared by segment synthesis and re-encode assembly.

use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "192k";
/// 4:2:0 pixel format understood by every mainstream player
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";

/// Tail cut applied to single-pair videos, in seconds.
pub const SINGLE_VIDEO_TAIL_CUT_SECS: f64 = 2.3;

/// Attachment names for delivered videos.
pub const SEQUENCE_OUTPUT_NAME: &str = "final_video.mp4";
pub const SINGLE_OUTPUT_NAME: &str = "single_video.mp4";
pub const MERGE_OUTPUT_NAME: &str = "final_merged_video.mp4";

/// Codec settings applied whenever the transcoder has to encode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingPolicy {
    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Output pixel format
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}
fn default_pixel_format() -> String {
    DEFAULT_PIXEL_FORMAT.to_string()
}

impl Default for EncodingPolicy {
    fn default() -> Self {
        Self {
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            pixel_format: default_pixel_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = EncodingPolicy::default();
        assert_eq!(policy.video_codec, "libx264");
        assert_eq!(policy.audio_codec, "aac");
        assert_eq!(policy.audio_bitrate, "192k");
        assert_eq!(policy.pixel_format, "yuv420p");
    }

    #[test]
    fn test_policy_deserialize_fills_defaults() {
        let policy: EncodingPolicy = serde_json::from_str(r#"{"audio_bitrate":"128k"}"#).unwrap();
        assert_eq!(policy.audio_bitrate, "128k");
        assert_eq!(policy.video_codec, DEFAULT_VIDEO_CODEC);
    }
}
