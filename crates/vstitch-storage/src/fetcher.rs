//! Asset fetcher.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use vstitch_models::{AssetKind, LocalAsset};

use crate::config::StorageConfig;
use crate::error::{FetchError, FetchResult};
use crate::token_cache::TokenCache;

/// Retrieves a remote resource into a local file.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Download `source_url` to `destination`, replacing any existing file.
    ///
    /// One attempt, no retry. On failure a partial file may remain at
    /// `destination`; the caller is responsible for removing it.
    async fn fetch(
        &self,
        source_url: &str,
        destination: &Path,
        kind: AssetKind,
    ) -> FetchResult<LocalAsset>;
}

/// HTTP(S) fetcher, optionally authorized with a service account.
#[derive(Clone)]
pub struct HttpFetcher {
    http: Client,
    tokens: Option<Arc<TokenCache>>,
    authorized_hosts: Arc<Vec<String>>,
}

impl HttpFetcher {
    /// Anonymous fetcher.
    pub fn new(config: &StorageConfig) -> FetchResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("vstitch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::config_error(e.to_string()))?;

        Ok(Self {
            http,
            tokens: None,
            authorized_hosts: Arc::new(config.authorized_hosts.clone()),
        })
    }

    /// Attach a token provider; its tokens go to authorized hosts only.
    pub fn with_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(Arc::new(TokenCache::new(provider)));
        self
    }

    /// Build from config, loading credentials if any are configured.
    ///
    /// Configured-but-broken credentials are an error here, so a
    /// misconfigured process fails at startup instead of on every request.
    pub async fn from_config(config: &StorageConfig) -> FetchResult<Self> {
        let fetcher = Self::new(config)?;

        match load_service_account(config)? {
            Some(provider) => {
                let fetcher = fetcher.with_token_provider(provider);
                fetcher.authorize().await?;
                info!(
                    "Asset store authorized for hosts: {}",
                    fetcher.authorized_hosts.join(", ")
                );
                Ok(fetcher)
            }
            None => {
                info!("No asset-store credentials configured, fetching anonymously");
                Ok(fetcher)
            }
        }
    }

    /// Obtain a token now; no-op for anonymous fetchers.
    pub async fn authorize(&self) -> FetchResult<()> {
        if let Some(tokens) = &self.tokens {
            tokens.get_token().await?;
        }
        Ok(())
    }

    fn sends_token_to(&self, url: &Url) -> bool {
        is_authorized_host(&self.authorized_hosts, url)
    }
}

/// Whether `url` is https and its host is on the allow-list.
fn is_authorized_host(hosts: &[String], url: &Url) -> bool {
    url.scheme() == "https"
        && url
            .host_str()
            .map(|host| hosts.iter().any(|h| h.eq_ignore_ascii_case(host)))
            .unwrap_or(false)
}

/// Service account from `credentials_path`, else from GOOGLE_APPLICATION_CREDENTIALS.
pub fn load_service_account(
    config: &StorageConfig,
) -> FetchResult<Option<Arc<dyn TokenProvider>>> {
    let account = match &config.credentials_path {
        Some(path) => Some(CustomServiceAccount::from_file(path).map_err(|e| {
            FetchError::auth_error(format!(
                "Failed to load service account from {}: {}",
                path.display(),
                e
            ))
        })?),
        None => CustomServiceAccount::from_env().map_err(|e| {
            FetchError::auth_error(format!("Failed to load service account: {}", e))
        })?,
    };

    Ok(account.map(|sa| Arc::new(sa) as Arc<dyn TokenProvider>))
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(
        &self,
        source_url: &str,
        destination: &Path,
        kind: AssetKind,
    ) -> FetchResult<LocalAsset> {
        let url = Url::parse(source_url).map_err(|_| FetchError::InvalidUrl(source_url.to_string()))?;

        let mut request = self.http.get(url.clone());
        let tokens = self.tokens.as_ref().filter(|_| self.sends_token_to(&url));
        if let Some(tokens) = tokens {
            request = request.bearer_auth(tokens.get_token().await?);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::network(source_url, e))?;

        let status = response.status();
        if !status.is_success() {
            if let (Some(tokens), StatusCode::UNAUTHORIZED) = (tokens, status) {
                // Revoked or rotated; the next job fetches a new token
                tokens.invalidate().await;
            }

            return Err(FetchError::Status {
                url: source_url.to_string(),
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown status").to_string(),
            });
        }

        let mut file = tokio::fs::File::create(destination).await?;
        let mut body = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| FetchError::network(source_url, e))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(
            kind = kind.as_str(),
            bytes = written,
            "Downloaded {} to {}",
            source_url,
            destination.display()
        );

        Ok(LocalAsset {
            source_url: source_url.to_string(),
            local_path: destination.to_path_buf(),
            kind,
        })
    }
}
