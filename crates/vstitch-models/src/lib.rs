//! Shared data models for the vstitch backend.
//!
//! This crate provides Serde-serializable types for:
//! - Asset pairs, local assets and synthesized segments
//! - Job identifiers, kinds and lifecycle states
//! - Request parsing and field-level validation
//! - Encoding policy constants shared by every FFmpeg invocation

pub mod asset;
pub mod encoding;
pub mod job;
pub mod request;

// Re-export common types
pub use asset::{AssetKind, AssetPair, LocalAsset, Segment, VideoSource};
pub use encoding::EncodingPolicy;
pub use job::{JobId, JobKind, JobState};
pub use request::{
    parse_merge_request, parse_sequence_request, parse_single_request, JobRequest, ValidationError,
};
