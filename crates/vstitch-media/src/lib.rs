//! FFmpeg CLI wrapper for video assembly.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building (argument vectors, never shell strings)
//! - A `CommandRunner` seam with a tokio::process implementation
//! - Duration probing through FFprobe
//! - Still-image + audio segment synthesis
//! - Concat-demuxer assembly in stream-copy or re-encode mode
//! - Stream-copy tail trimming

pub mod command;
pub mod concat;
pub mod error;
pub mod probe;
pub mod synthesize;
pub mod trim;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use command::{
    check_ffmpeg, check_ffprobe, ffmpeg_version, CommandInvocation, CommandRunner, FfmpegCommand,
    ProcessRunner,
};
pub use concat::{assemble, ConcatMode};
pub use error::{MediaError, MediaResult};
pub use probe::probe_duration;
pub use synthesize::synthesize_segment;
pub use trim::{trim_tail, TrimResult};
