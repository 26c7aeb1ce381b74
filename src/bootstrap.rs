//! IANA RDAP bootstrap registry with an on-disk, time-limited cache.
//!
//! The registry document is persisted verbatim. Staleness comes from the
//! file's own modification time, so there is no embedded timestamp.

use crate::{config::ProxyConfig, errors::RdapError, retry::RetryExecutor};
use async_trait::async_trait;
use serde_json::Value;
use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, SystemTime},
};
use tracing::{debug, info, warn};

// RDAP Bootstrap Service URL for dynamic discovery
pub const RDAP_BOOTSTRAP_URL: &str = "https://data.iana.org/rdap/dns.json";

pub const DEFAULT_CACHE_FILE: &str = ".rdap-tld-cache.json";
pub const BOOTSTRAP_TTL: Duration = Duration::from_secs(24 * 3600);
pub const BOOTSTRAP_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw bootstrap document. Services are interpreted lazily at lookup time.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapRegistry {
    raw: Value,
}

impl BootstrapRegistry {
    pub fn from_value(raw: Value) -> Self {
        Self { raw }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, RdapError> {
        Ok(Self::from_value(serde_json::from_slice(bytes)?))
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Iterate well-formed `[[tlds...], [urls...]]` services in registry
    /// order. Malformed entries are skipped.
    pub fn services(&self) -> impl Iterator<Item = BootstrapService<'_>> {
        self.raw
            .get("services")
            .and_then(Value::as_array)
            .map(|services| services.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|service| {
                let pair = service.as_array()?;
                let tlds = pair.first()?.as_array()?;
                let urls = pair.get(1)?.as_array()?;
                Some(BootstrapService {
                    tlds: tlds.iter().filter_map(Value::as_str).collect(),
                    urls: urls.iter().filter_map(Value::as_str).collect(),
                })
            })
    }

    /// First service that lists `tld`. Entries are compared lowercased with
    /// any leading dot removed.
    pub fn find_service(&self, tld: &str) -> Option<BootstrapService<'_>> {
        let tld = tld.trim_start_matches('.').to_lowercase();
        self.services().find(|service| {
            service
                .tlds
                .iter()
                .any(|entry| entry.strip_prefix('.').unwrap_or(entry).to_lowercase() == tld)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapService<'a> {
    pub tlds: Vec<&'a str>,
    pub urls: Vec<&'a str>,
}

/// Where a fresh registry document comes from.
#[async_trait]
pub trait BootstrapSource: Send + Sync {
    /// Return the document bytes exactly as received.
    async fn fetch(&self) -> Result<Vec<u8>, RdapError>;
}

pub struct HttpBootstrapSource {
    client: reqwest::Client,
    url: String,
}

impl HttpBootstrapSource {
    /// Source for the IANA registry, routed through `proxy` when given.
    pub fn new(proxy: Option<&ProxyConfig>) -> Result<Self, RdapError> {
        Self::with_url(RDAP_BOOTSTRAP_URL, proxy)
    }

    pub fn with_url(url: impl Into<String>, proxy: Option<&ProxyConfig>) -> Result<Self, RdapError> {
        let mut builder = reqwest::Client::builder()
            .timeout(BOOTSTRAP_FETCH_TIMEOUT)
            .gzip(true);
        if let Some(proxy) = proxy {
            debug!("Routing bootstrap fetches through proxy {}", proxy.url());
            builder = builder.proxy(proxy.to_reqwest()?);
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl BootstrapSource for HttpBootstrapSource {
    async fn fetch(&self) -> Result<Vec<u8>, RdapError> {
        info!("Updating RDAP bootstrap dataset from {}", self.url);

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RdapError::Fetch(format!(
                "bootstrap fetch failed with status: {}",
                status
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Explicit handle on the persisted registry.
#[derive(Clone)]
pub struct BootstrapCache {
    path: PathBuf,
    ttl: Duration,
    source: Arc<dyn BootstrapSource>,
    executor: RetryExecutor,
    refresh_retries: u32,
}

impl BootstrapCache {
    pub fn with_source(path: impl Into<PathBuf>, source: Arc<dyn BootstrapSource>) -> Self {
        Self {
            path: path.into(),
            ttl: BOOTSTRAP_TTL,
            source,
            executor: RetryExecutor::new(0, Duration::from_millis(1000)),
            refresh_retries: 0,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Run refreshes through `executor` with `retries` extra attempts. The
    /// default is a single attempt.
    pub fn with_refresh_retries(mut self, executor: RetryExecutor, retries: u32) -> Self {
        self.executor = executor;
        self.refresh_retries = retries;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry, refreshing it from the source when the cache file
    /// is missing or at least `ttl` old.
    pub async fn load(&self) -> Result<BootstrapRegistry, RdapError> {
        if let Some(age) = self.cache_age().await {
            if age < self.ttl {
                match self.read_cached().await {
                    Ok(registry) => {
                        debug!("Using cached RDAP bootstrap ({}s old)", age.as_secs());
                        return Ok(registry);
                    }
                    Err(e) => warn!("Ignoring unreadable bootstrap cache {}: {}", self.path.display(), e),
                }
            }
        }

        match self.refresh().await {
            Ok(registry) => Ok(registry),
            Err(e) => {
                // a stale copy still beats no registry at all
                if let Ok(registry) = self.read_cached().await {
                    warn!("Bootstrap refresh failed ({}), using stale cache", e);
                    return Ok(registry);
                }
                Err(match e {
                    RdapError::Fetch(_) => e,
                    other => RdapError::Fetch(other.to_string()),
                })
            }
        }
    }

    async fn refresh(&self) -> Result<BootstrapRegistry, RdapError> {
        let bytes = self
            .executor
            .run_with(self.refresh_retries, |_| self.source.fetch())
            .await?;

        let registry = BootstrapRegistry::from_slice(&bytes)?;
        if registry.raw().get("services").and_then(Value::as_array).is_none() {
            return Err(RdapError::Fetch(
                "invalid bootstrap JSON: missing or invalid 'services' array".to_string(),
            ));
        }

        self.persist(bytes).await?;
        info!("Cached RDAP bootstrap registry at {}", self.path.display());
        Ok(registry)
    }

    async fn cache_age(&self) -> Option<Duration> {
        let metadata = tokio::fs::metadata(&self.path).await.ok()?;
        let modified = metadata.modified().ok()?;
        // mtime in the future counts as fresh
        Some(
            SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO),
        )
    }

    async fn read_cached(&self) -> Result<BootstrapRegistry, RdapError> {
        let bytes = tokio::fs::read(&self.path).await?;
        BootstrapRegistry::from_slice(&bytes)
    }

    /// Write to a temp file next to the cache and rename it into place, so
    /// readers see either the old or the new document, never a partial one.
    async fn persist(&self, bytes: Vec<u8>) -> Result<(), RdapError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), RdapError> {
            let dir = match path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let mut file = tempfile::NamedTempFile::new_in(&dir)?;
            file.write_all(&bytes)?;
            file.as_file().sync_all()?;
            file.persist(&path).map_err(|e| RdapError::Io(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| RdapError::Internal(format!("cache write task failed: {}", e)))?
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) fn registry_json() -> Value {
        json!({
            "version": "1.0",
            "publication": "2024-01-01T00:00:00Z",
            "services": [
                [["com", "net"], ["https://rdap.verisign.com/com/v1/"]],
                [[".BR"], ["https://rdap.registro.br/", "https://backup.registro.br/"]],
                [["org"], ["https://rdap.publicinterestregistry.org/rdap"]],
                [["com"], ["https://shadowed.example/"]],
                "garbage"
            ]
        })
    }

    /// Counts fetches and serves a fixed document or error.
    pub(crate) struct FakeSource {
        pub body: Option<Vec<u8>>,
        pub calls: AtomicUsize,
    }

    impl FakeSource {
        pub(crate) fn serving(value: &Value) -> Arc<Self> {
            Arc::new(Self {
                body: Some(serde_json::to_vec(value).unwrap()),
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn failing() -> Arc<Self> {
            Arc::new(Self {
                body: None,
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BootstrapSource for FakeSource {
        async fn fetch(&self) -> Result<Vec<u8>, RdapError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.body
                .clone()
                .ok_or_else(|| RdapError::Fetch("source offline".to_string()))
        }
    }

    fn age_file(path: &Path, age: Duration) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_find_service_is_case_insensitive_and_first_wins() {
        let registry = BootstrapRegistry::from_value(registry_json());
        assert_eq!(registry.services().count(), 4);

        let com = registry.find_service("COM").unwrap();
        assert_eq!(com.urls, vec!["https://rdap.verisign.com/com/v1/"]);

        let br = registry.find_service("br").unwrap();
        assert_eq!(br.urls[0], "https://rdap.registro.br/");

        assert!(registry.find_service("zz").is_none());
    }

    #[tokio::test]
    async fn test_fresh_cache_makes_no_network_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CACHE_FILE);
        std::fs::write(&path, serde_json::to_vec(&registry_json()).unwrap()).unwrap();

        let source = FakeSource::serving(&json!({ "services": [] }));
        let cache = BootstrapCache::with_source(&path, source.clone());

        let registry = cache.load().await.unwrap();
        assert_eq!(source.calls(), 0);
        assert!(registry.find_service("org").is_some());
    }

    #[tokio::test]
    async fn test_absent_cache_fetches_once_and_persists_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CACHE_FILE);
        let source = FakeSource::serving(&registry_json());
        let cache = BootstrapCache::with_source(&path, source.clone());

        cache.load().await.unwrap();
        assert_eq!(source.calls(), 1);
        assert_eq!(std::fs::read(&path).unwrap(), source.body.clone().unwrap());

        // second load hits the fresh file
        cache.load().await.unwrap();
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_ttl_controls_freshness() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CACHE_FILE);
        std::fs::write(&path, serde_json::to_vec(&registry_json()).unwrap()).unwrap();
        age_file(&path, Duration::from_secs(120));

        let source = FakeSource::serving(&registry_json());
        let cache = BootstrapCache::with_source(&path, source.clone()).with_ttl(Duration::from_secs(60));

        cache.load().await.unwrap();
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_stale_cache_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CACHE_FILE);
        std::fs::write(&path, br#"{"services": []}"#).unwrap();
        age_file(&path, Duration::from_secs(25 * 3600));

        let source = FakeSource::serving(&registry_json());
        let cache = BootstrapCache::with_source(&path, source.clone());

        let registry = cache.load().await.unwrap();
        assert_eq!(source.calls(), 1);
        assert!(registry.find_service("com").is_some());

        let on_disk: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk, registry_json());
    }

    #[tokio::test]
    async fn test_failed_refresh_without_cache_is_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BootstrapCache::with_source(dir.path().join("missing.json"), FakeSource::failing());

        let result = cache.load().await;
        assert!(matches!(result, Err(RdapError::Fetch(_))));
    }

    #[tokio::test]
    async fn test_failed_refresh_falls_back_to_stale_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CACHE_FILE);
        std::fs::write(&path, serde_json::to_vec(&registry_json()).unwrap()).unwrap();
        age_file(&path, Duration::from_secs(48 * 3600));

        let source = FakeSource::failing();
        let cache = BootstrapCache::with_source(&path, source.clone());

        let registry = cache.load().await.unwrap();
        assert_eq!(source.calls(), 1);
        assert!(registry.find_service("net").is_some());
    }

    #[tokio::test]
    async fn test_refresh_retry_budget_bounds_fetch_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::failing();
        let cache = BootstrapCache::with_source(dir.path().join(DEFAULT_CACHE_FILE), source.clone())
            .with_refresh_retries(RetryExecutor::new(3, Duration::from_millis(1)), 2);

        assert!(matches!(cache.load().await, Err(RdapError::Fetch(_))));
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_refresh_defaults_to_single_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::failing();
        let cache = BootstrapCache::with_source(dir.path().join(DEFAULT_CACHE_FILE), source.clone());

        assert!(cache.load().await.is_err());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_http_source_fetches_through_proxy() {
        use httpmock::prelude::*;

        let proxy = MockServer::start();
        let mock = proxy.mock(|when, then| {
            when.method(GET).path("/rdap/dns.json");
            then.status(200).json_body(registry_json());
        });

        // the host does not resolve, so only the proxy can answer
        let config = ProxyConfig::new("127.0.0.1", proxy.port());
        let source =
            HttpBootstrapSource::with_url("http://bootstrap.invalid/rdap/dns.json", Some(&config)).unwrap();

        let body = source.fetch().await.unwrap();
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), registry_json());
        assert_eq!(mock.calls(), 1);
    }

    #[test]
    fn test_http_source_accepts_authenticated_proxy() {
        let config = ProxyConfig::new("127.0.0.1", 3128).with_auth("user", "secret");
        assert!(HttpBootstrapSource::new(Some(&config)).is_ok());
    }

    #[tokio::test]
    async fn test_document_without_services_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CACHE_FILE);
        let cache = BootstrapCache::with_source(&path, FakeSource::serving(&json!({ "version": "1.0" })));

        assert!(matches!(cache.load().await, Err(RdapError::Fetch(_))));
        assert!(!path.exists());
    }
}
