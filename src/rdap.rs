//! RDAP (Registration Data Access Protocol) query service.
//!
//! Resolves the authoritative server for a domain and fetches its RDAP
//! document, retrying every failure with exponential backoff. Each attempt
//! carries its own header set.

use crate::{
    bootstrap::{BootstrapCache, BootstrapSource, HttpBootstrapSource, DEFAULT_CACHE_FILE},
    config::ClientConfig,
    document::RdapDocument,
    errors::RdapError,
    headers::{HeaderRandomizer, HeaderSet},
    resolver::ServerResolver,
    retry::RetryExecutor,
};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

pub struct RdapService {
    config: ClientConfig,
    client: reqwest::Client,
    resolver: ServerResolver,
    executor: RetryExecutor,
    randomizer: HeaderRandomizer,
}

impl RdapService {
    /// Service backed by the IANA bootstrap registry, cached at the
    /// configured path or in the working directory.
    pub fn new(config: ClientConfig) -> Result<Self, RdapError> {
        let source = HttpBootstrapSource::new(config.proxy.as_ref())?;
        let cache = bootstrap_cache(&config, Arc::new(source))?;
        Self::with_resolver(config, ServerResolver::new(cache))
    }

    pub fn with_resolver(config: ClientConfig, resolver: ServerResolver) -> Result<Self, RdapError> {
        let client = build_http_client(&config)?;
        let executor = RetryExecutor::new(config.retries, config.retry_delay);

        info!(
            "RdapService initialized (timeout {}s, {} retries, randomized headers: {})",
            config.timeout.as_secs(),
            config.retries,
            config.randomize_headers
        );

        Ok(Self {
            config,
            client,
            resolver,
            executor,
            randomizer: HeaderRandomizer::new(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn resolver(&self) -> &ServerResolver {
        &self.resolver
    }

    /// The configured HTTP client (timeout and proxy applied).
    pub fn http_client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Fetch the RDAP document for `domain`. `explicit_url` skips resolution
    /// and is requested verbatim.
    pub async fn query_domain(
        &self,
        domain: &str,
        explicit_url: Option<&str>,
    ) -> Result<RdapDocument, RdapError> {
        let url = match explicit_url {
            Some(url) => Url::parse(url)?,
            None => self.resolver.resolve(domain).await?.url,
        };

        info!("Querying RDAP for {} at {}", domain, url);
        let url = &url;
        self.executor
            .run(|attempt| self.fetch_document(url, attempt))
            .await
    }

    async fn fetch_document(&self, url: &Url, attempt: u32) -> Result<RdapDocument, RdapError> {
        let headers = if self.config.randomize_headers {
            self.randomizer.generate()
        } else {
            HeaderSet::static_defaults()
        };
        debug!("RDAP request #{}: GET {}", attempt + 1, url);
        debug!("Request headers: {:?}", headers);

        let response = self
            .client
            .get(url.clone())
            .headers(headers.to_header_map())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(RdapError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response.bytes().await.map_err(transport_error)?;
        debug!("RDAP response: {} bytes", body.len());

        serde_json::from_slice::<RdapDocument>(&body)
            .map_err(|e| RdapError::Parse(format!("invalid RDAP document from {}: {}", url, e)))
    }
}

/// Bootstrap cache at the configured path, or in the working directory.
/// Refreshes share the query executor but get a single attempt.
pub(crate) fn bootstrap_cache(
    config: &ClientConfig,
    source: Arc<dyn BootstrapSource>,
) -> Result<BootstrapCache, RdapError> {
    let path = match &config.bootstrap_cache_path {
        Some(path) => path.clone(),
        None => std::env::current_dir()?.join(DEFAULT_CACHE_FILE),
    };
    let executor = RetryExecutor::new(config.retries, config.retry_delay);
    Ok(BootstrapCache::with_source(path, source).with_refresh_retries(executor, 0))
}

fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client, RdapError> {
    let mut builder = reqwest::Client::builder()
        .timeout(config.timeout)
        .gzip(true)
        .brotli(true)
        .deflate(true);

    if let Some(proxy_config) = &config.proxy {
        debug!("Routing RDAP traffic through proxy {}", proxy_config.url());
        builder = builder.proxy(proxy_config.to_reqwest()?);
    }

    Ok(builder.build()?)
}

fn transport_error(e: reqwest::Error) -> RdapError {
    if e.is_timeout() {
        RdapError::Timeout
    } else {
        RdapError::Transport(e)
    }
}
