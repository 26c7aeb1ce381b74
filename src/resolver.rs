use crate::{bootstrap::BootstrapCache, errors::RdapError};
use tracing::{debug, warn};
use url::Url;

/// IANA redirector used when no bootstrap service covers a TLD.
pub const FALLBACK_RDAP_BASE: &str = "https://rdap.iana.org";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerSource {
    Bootstrap,
    /// No bootstrap entry matched. The URL points at the IANA redirector.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedServer {
    pub url: Url,
    pub source: ServerSource,
}

impl ResolvedServer {
    pub fn is_fallback(&self) -> bool {
        self.source == ServerSource::Fallback
    }
}

pub struct ServerResolver {
    cache: BootstrapCache,
}

impl ServerResolver {
    pub fn new(cache: BootstrapCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &BootstrapCache {
        &self.cache
    }

    /// Map `domain` to the RDAP domain-query URL of its TLD's server.
    pub async fn resolve(&self, domain: &str) -> Result<ResolvedServer, RdapError> {
        let tld = extract_tld(domain)?;
        let registry = self.cache.load().await?;

        let base = registry
            .find_service(&tld)
            .and_then(|service| service.urls.first().map(|url| url.to_string()));

        match base {
            Some(base) => {
                let url = domain_url(&base, domain)?;
                debug!("Resolved RDAP server for .{}: {}", tld, url);
                Ok(ResolvedServer {
                    url,
                    source: ServerSource::Bootstrap,
                })
            }
            None => {
                warn!("No RDAP server found for .{}, using fallback IANA", tld);
                Ok(ResolvedServer {
                    url: domain_url(FALLBACK_RDAP_BASE, domain)?,
                    source: ServerSource::Fallback,
                })
            }
        }
    }
}

/// Rightmost dot-delimited label, lowercased.
pub fn extract_tld(domain: &str) -> Result<String, RdapError> {
    match domain.rsplit('.').next() {
        Some(tld) if !tld.is_empty() => Ok(tld.to_lowercase()),
        _ => Err(RdapError::InvalidDomain(format!(
            "No TLD found in domain: {}",
            domain
        ))),
    }
}

fn domain_url(base: &str, domain: &str) -> Result<Url, RdapError> {
    let base = base.strip_suffix('/').unwrap_or(base);
    Ok(Url::parse(&format!("{}/domain/{}", base, domain))?)
}
