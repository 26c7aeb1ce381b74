//! # RDAP Service Library
//!
//! Registration Data Access Protocol lookups for domain names.
//!
//! ## Features
//!
//! - Server discovery through the IANA bootstrap registry, cached on disk
//! - Retries with exponential backoff
//! - Per-request header randomization
//! - Typed documents that keep every extension field
//! - Normalized summaries and contact extraction from jCard
//! - Optional in-memory response cache
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rdap_service::RdapClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RdapClient::new()?;
//!     let summary = client.summary("example.com").await?;
//!
//!     println!("{}", summary);
//!
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod document;
pub mod domain;
pub mod errors;
pub mod headers;
#[cfg(feature = "server")]
pub mod metrics;
pub mod normalize;
pub mod rdap;
pub mod reachability;
pub mod resolver;
pub mod retry;

// Re-export main types for easy access
pub use cache::CacheService;
pub use config::{ClientConfig, ProxyConfig, ServiceConfig};
pub use document::RdapDocument;
pub use domain::normalize_domain_input;
pub use errors::RdapError;
pub use normalize::{format_summary, parse_contact, ContactLine, ContactRecord, FormattedSummary};
pub use rdap::RdapService;

use std::{sync::Arc, time::Duration};

const DEFAULT_CACHE_ENTRIES: u64 = 10_000;
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// High-level RDAP client with optional caching
#[derive(Clone)]
pub struct RdapClient {
    service: Arc<RdapService>,
    cache: Option<Arc<CacheService>>,
}

impl RdapClient {
    /// Client with default configuration and a response cache
    pub fn new() -> Result<Self, RdapError> {
        Self::new_with_config(ClientConfig::default())
    }

    pub fn new_with_config(config: ClientConfig) -> Result<Self, RdapError> {
        let service = Arc::new(RdapService::new(config)?);
        let cache = Arc::new(CacheService::new(DEFAULT_CACHE_ENTRIES, DEFAULT_CACHE_TTL));
        Ok(Self::from_parts(service, Some(cache)))
    }

    /// Client that always goes to the network
    pub fn new_without_cache() -> Result<Self, RdapError> {
        let service = Arc::new(RdapService::new(ClientConfig::default())?);
        Ok(Self::from_parts(service, None))
    }

    pub fn from_parts(service: Arc<RdapService>, cache: Option<Arc<CacheService>>) -> Self {
        Self { service, cache }
    }

    pub fn service(&self) -> &RdapService {
        &self.service
    }

    /// Look up a domain, using the cache when one is configured.
    ///
    /// Input may be a bare domain or a URL; it is normalized first.
    pub async fn lookup(&self, domain: &str) -> Result<Arc<RdapDocument>, RdapError> {
        self.lookup_with_options(domain, false).await
    }

    /// Look up a domain, bypassing (but refreshing) the cache.
    pub async fn lookup_fresh(&self, domain: &str) -> Result<Arc<RdapDocument>, RdapError> {
        self.lookup_with_options(domain, true).await
    }

    pub async fn lookup_with_options(
        &self,
        domain: &str,
        fresh: bool,
    ) -> Result<Arc<RdapDocument>, RdapError> {
        let domain = normalize_domain_input(domain)?;

        if !fresh {
            if let Some(cache) = &self.cache {
                if let Some(doc) = cache.get(&domain).await {
                    return Ok(doc);
                }
            }
        }

        let doc = Arc::new(self.service.query_domain(&domain, None).await?);

        if let Some(cache) = &self.cache {
            cache.set(&domain, doc.clone()).await;
        }

        Ok(doc)
    }

    pub async fn summary(&self, domain: &str) -> Result<FormattedSummary, RdapError> {
        let doc = self.lookup(domain).await?;
        Ok(format_summary(&doc))
    }

    pub async fn contacts(&self, domain: &str) -> Result<Vec<ContactLine>, RdapError> {
        let doc = self.lookup(domain).await?;
        Ok(normalize::contacts(&doc))
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }
}
