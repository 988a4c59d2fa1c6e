//! Worker configuration.

use std::path::PathBuf;

use vstitch_models::encoding::SINGLE_VIDEO_TAIL_CUT_SECS;
use vstitch_models::EncodingPolicy;

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base directory; each job gets `<work_dir>/<job_id>/`
    pub work_dir: PathBuf,
    /// Maximum concurrent downloads per job
    pub max_fetch_parallel: usize,
    /// Maximum concurrent FFmpeg synthesis processes per job
    pub max_synth_parallel: usize,
    /// Kill any external process running longer than this
    pub command_timeout_secs: Option<u64>,
    /// Seconds cut from the end of single-pair videos
    pub single_tail_cut_secs: f64,
    /// Codec policy for synthesis and re-encode assembly
    pub encoding: EncodingPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("vstitch"),
            max_fetch_parallel: 4,
            max_synth_parallel: 2,
            command_timeout_secs: None,
            single_tail_cut_secs: SINGLE_VIDEO_TAIL_CUT_SECS,
            encoding: EncodingPolicy::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("WORK_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            max_fetch_parallel: std::env::var("MAX_FETCH_PARALLEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_fetch_parallel),
            max_synth_parallel: std::env::var("MAX_SYNTH_PARALLEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_synth_parallel),
            command_timeout_secs: std::env::var("COMMAND_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0),
            single_tail_cut_secs: std::env::var("SINGLE_TAIL_CUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &f64| n.is_finite() && *n >= 0.0)
                .unwrap_or(defaults.single_tail_cut_secs),
            encoding: defaults.encoding,
        }
    }
}
