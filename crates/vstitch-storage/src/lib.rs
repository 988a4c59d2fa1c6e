//! Remote asset retrieval.
//!
//! Features:
//! - Streaming HTTP(S) download straight to the job's working directory
//! - Optional Google service-account authorization (read-only Drive scope)
//! - Bearer tokens only sent to an explicit allow-list of hosts
//! - Token caching with refresh margin

pub mod config;
pub mod error;
pub mod fetcher;
pub mod token_cache;

pub use config::StorageConfig;
pub use error::{FetchError, FetchResult};
pub use fetcher::{AssetFetcher, HttpFetcher};
pub use token_cache::{TokenCache, DRIVE_READONLY_SCOPE};
