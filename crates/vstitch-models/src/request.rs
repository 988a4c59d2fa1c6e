//! Request bodies and their validation.
//!
//! Bodies arrive as flat JSON objects with indexed keys (`imageURL1`,
//! `audioURL1`, ...). Parsing happens before any network or process work,
//! so a rejected request never leaves anything behind.

use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use crate::asset::{AssetPair, VideoSource};
use crate::job::JobKind;

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    /// Required fields that were absent or empty
    pub missing_fields: Vec<String>,
    /// Fields present but not an http(s) URL
    pub invalid_fields: Vec<String>,
}

impl ValidationError {
    pub fn missing(message: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            message: message.into(),
            missing_fields: fields,
            invalid_fields: Vec::new(),
        }
    }

    pub fn invalid(message: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            message: message.into(),
            missing_fields: Vec::new(),
            invalid_fields: fields,
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::missing(message, Vec::new())
    }
}

/// A validated request, ready for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRequest {
    Sequence(Vec<AssetPair>),
    Single(AssetPair),
    Merge(Vec<VideoSource>),
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::Sequence(_) => JobKind::Sequence,
            JobRequest::Single(_) => JobKind::Single,
            JobRequest::Merge(_) => JobKind::Merge,
        }
    }

    /// Number of remote assets the request will fetch.
    pub fn asset_count(&self) -> usize {
        match self {
            JobRequest::Sequence(pairs) => pairs.len() * 2,
            JobRequest::Single(_) => 2,
            JobRequest::Merge(videos) => videos.len(),
        }
    }

    /// Structural checks for requests built in code rather than parsed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            JobRequest::Sequence(pairs) if pairs.is_empty() => {
                Err(ValidationError::other("At least one image/audio pair is required"))
            }
            JobRequest::Merge(videos) if videos.is_empty() => {
                Err(ValidationError::other("At least one video URL is required"))
            }
            _ => Ok(()),
        }
    }
}

/// Non-empty string value of `name`, if any.
fn field<'a>(body: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    body.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw.trim())
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
        .unwrap_or(false)
}

fn check_urls<'a>(fields: impl IntoIterator<Item = (String, &'a str)>) -> Result<(), ValidationError> {
    let invalid: Vec<String> = fields
        .into_iter()
        .filter(|(_, value)| !is_http_url(value))
        .map(|(name, _)| name)
        .collect();

    if invalid.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::invalid(
            "Some fields are not valid http(s) URLs.",
            invalid,
        ))
    }
}

/// Collect `imageURL{n}`/`audioURL{n}` pairs for n = 1, 2, 3, ...
///
/// The first index where either field is missing ends the list; later
/// indices are ignored. Zero pairs, or more than `max_pairs`, is an error.
pub fn parse_sequence_request(
    body: &Map<String, Value>,
    max_pairs: usize,
) -> Result<Vec<AssetPair>, ValidationError> {
    let mut pairs = Vec::new();

    for index in 1u32.. {
        let image = field(body, &format!("imageURL{}", index));
        let audio = field(body, &format!("audioURL{}", index));
        match (image, audio) {
            (Some(image), Some(audio)) => pairs.push(AssetPair::new(index, image.trim(), audio.trim())),
            _ => break,
        }
        if pairs.len() > max_pairs {
            return Err(ValidationError::other(format!(
                "Too many image/audio pairs (maximum is {})",
                max_pairs
            )));
        }
    }

    if pairs.is_empty() {
        let missing = ["imageURL1", "audioURL1"]
            .into_iter()
            .filter(|name| field(body, name).is_none())
            .map(String::from)
            .collect();
        return Err(ValidationError::missing(
            "Some fields are missing from the request body.",
            missing,
        ));
    }

    check_urls(pairs.iter().flat_map(|p| {
        [
            (format!("imageURL{}", p.index), p.image_url.as_str()),
            (format!("audioURL{}", p.index), p.audio_url.as_str()),
        ]
    }))?;

    Ok(pairs)
}

/// Parse `{imageURL, audioURL}`.
pub fn parse_single_request(body: &Map<String, Value>) -> Result<AssetPair, ValidationError> {
    let image = field(body, "imageURL");
    let audio = field(body, "audioURL");

    match (image, audio) {
        (Some(image), Some(audio)) => {
            check_urls([
                ("imageURL".to_string(), image),
                ("audioURL".to_string(), audio),
            ])?;
            Ok(AssetPair::new(1, image.trim(), audio.trim()))
        }
        _ => {
            let mut missing = Vec::new();
            if image.is_none() {
                missing.push("imageURL".to_string());
            }
            if audio.is_none() {
                missing.push("audioURL".to_string());
            }
            Err(ValidationError::missing(
                "Some fields are missing from the request body.",
                missing,
            ))
        }
    }
}

/// Parse exactly `videoURL1..=videoURL{count}`; every field is required.
pub fn parse_merge_request(
    body: &Map<String, Value>,
    count: u32,
) -> Result<Vec<VideoSource>, ValidationError> {
    let mut videos = Vec::with_capacity(count as usize);
    let mut missing = Vec::new();

    for index in 1..=count {
        let name = format!("videoURL{}", index);
        match field(body, &name) {
            Some(url) => videos.push(VideoSource {
                index,
                url: url.trim().to_string(),
            }),
            None => missing.push(name),
        }
    }

    if !missing.is_empty() {
        return Err(ValidationError::missing(
            "Some fields are missing from the request body.",
            missing,
        ));
    }
    if videos.is_empty() {
        return Err(ValidationError::other("At least one video URL is required"));
    }

    check_urls(
        videos
            .iter()
            .map(|v| (format!("videoURL{}", v.index), v.url.as_str())),
    )?;

    Ok(videos)
}
