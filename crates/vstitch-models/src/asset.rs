//! Remote assets, their local copies and synthesized segments.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Extensions accepted from a source URL, per kind.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "gif"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "aac", "ogg", "opus", "flac"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm", "m4v"];

/// Media kind of a fetched asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image,
    Audio,
    Video,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Audio => "audio",
            AssetKind::Video => "video",
        }
    }

    /// Extension used when the URL doesn't carry a recognizable one.
    pub fn default_extension(&self) -> &'static str {
        match self {
            AssetKind::Image => "png",
            AssetKind::Audio => "mp3",
            AssetKind::Video => "mp4",
        }
    }

    fn known_extensions(&self) -> &'static [&'static str] {
        match self {
            AssetKind::Image => IMAGE_EXTENSIONS,
            AssetKind::Audio => AUDIO_EXTENSIONS,
            AssetKind::Video => VIDEO_EXTENSIONS,
        }
    }

    /// Pick a local file extension for an asset downloaded from `source_url`.
    ///
    /// FFmpeg's image demuxer selects the decoder from the extension, so a
    /// JPEG must not be stored as `.png`. Download links without a usable
    /// path extension (Drive `export=download` links, signed URLs) fall back
    /// to the per-kind default.
    pub fn extension_for(&self, source_url: &str) -> String {
        Url::parse(source_url)
            .ok()
            .and_then(|url| {
                let segment = url.path_segments()?.next_back()?.to_string();
                let (_, ext) = segment.rsplit_once('.')?;
                let ext = ext.to_ascii_lowercase();
                self.known_extensions()
                    .contains(&ext.as_str())
                    .then_some(ext)
            })
            .unwrap_or_else(|| self.default_extension().to_string())
    }

    /// Job-local file name for the `index`-th asset of this kind.
    pub fn file_name(&self, index: u32, source_url: &str) -> String {
        format!("{}{}.{}", self.as_str(), index, self.extension_for(source_url))
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One image/audio pair from a request. Index is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPair {
    pub index: u32,
    pub image_url: String,
    pub audio_url: String,
}

impl AssetPair {
    pub fn new(index: u32, image_url: impl Into<String>, audio_url: impl Into<String>) -> Self {
        Self {
            index,
            image_url: image_url.into(),
            audio_url: audio_url.into(),
        }
    }
}

/// One pre-made clip from a merge request. Index is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSource {
    pub index: u32,
    pub url: String,
}

/// A remote asset copied into the job's working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAsset {
    pub source_url: String,
    pub local_path: PathBuf,
    pub kind: AssetKind,
}

/// A video synthesized from one image/audio pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub index: u32,
    pub source: AssetPair,
    pub output_path: PathBuf,
}

impl Segment {
    /// Job-local file name for the segment of pair `index`.
    pub fn file_name(index: u32) -> String {
        format!("segment{}.mp4", index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_url_path() {
        assert_eq!(
            AssetKind::Image.extension_for("https://cdn.example.com/a/b/Photo.JPG?sig=1"),
            "jpg"
        );
        assert_eq!(
            AssetKind::Audio.extension_for("https://cdn.example.com/track.wav"),
            "wav"
        );
    }

    #[test]
    fn test_extension_falls_back_to_kind_default() {
        let drive = "https://drive.google.com/uc?export=download&id=abc123";
        assert_eq!(AssetKind::Image.extension_for(drive), "png");
        assert_eq!(AssetKind::Audio.extension_for(drive), "mp3");
        assert_eq!(AssetKind::Video.extension_for(drive), "mp4");
    }

    #[test]
    fn test_extension_of_wrong_kind_is_ignored() {
        // An .mp3 path is not a plausible image
        assert_eq!(AssetKind::Image.extension_for("https://x.test/song.mp3"), "png");
        assert_eq!(AssetKind::Video.extension_for("not a url"), "mp4");
    }

    #[test]
    fn test_file_names() {
        assert_eq!(AssetKind::Image.file_name(3, "https://x.test/p.jpeg"), "image3.jpeg");
        assert_eq!(AssetKind::Audio.file_name(1, "https://x.test/"), "audio1.mp3");
        assert_eq!(Segment::file_name(2), "segment2.mp4");
    }
}
