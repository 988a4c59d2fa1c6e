//! Job orchestration for vstitch.
//!
//! A job runs `Validating → Fetching → Synthesizing → Assembling →
//! [Trimming] → Delivering` and always ends with its private working
//! directory removed, whether it succeeded or not.

pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod workspace;

pub use config::WorkerConfig;
pub use error::{JobError, JobResult};
pub use job::{Job, JobOutput};
pub use logging::JobLogger;
pub use orchestrator::JobOrchestrator;
pub use workspace::{CleanupReport, JobWorkspace};
