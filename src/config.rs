use crate::errors::RdapError;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration, time::Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Options for a single RDAP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
    pub randomize_headers: bool,
    pub proxy: Option<ProxyConfig>,
    /// Bootstrap cache file. `None` means `.rdap-tld-cache.json` in the
    /// working directory.
    pub bootstrap_cache_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            randomize_headers: true,
            proxy: None,
            bootstrap_cache_path: None,
        }
    }
}

impl ClientConfig {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn randomize_headers(mut self, enabled: bool) -> Self {
        self.randomize_headers = enabled;
        self
    }

    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn bootstrap_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.bootstrap_cache_path = Some(path.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    pub auth: Option<ProxyAuth>,
}

impl ProxyConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            auth: None,
        }
    }

    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(ProxyAuth {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Proxy URL as reqwest expects it. Credentials are applied separately.
    pub fn url(&self) -> String {
        if self.host.contains("://") {
            format!("{}:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    /// The reqwest proxy for every scheme, credentials included.
    pub fn to_reqwest(&self) -> Result<reqwest::Proxy, RdapError> {
        let mut proxy = reqwest::Proxy::all(self.url())?;
        if let Some(auth) = &self.auth {
            proxy = proxy.basic_auth(&auth.username, &auth.password);
        }
        Ok(proxy)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ProxyAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Settings for the HTTP service, read from the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub cache_ttl_seconds: u64,
    pub cache_max_entries: u64,
    pub precheck_reachability: bool,
    pub client: ClientConfig,
    pub start_time: Instant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigData {
    pub port: u16,
    pub cache_ttl_seconds: u64,
    pub cache_max_entries: u64,
    pub precheck_reachability: bool,
    pub rdap_timeout_seconds: u64,
    pub rdap_retries: u32,
    pub rdap_retry_delay_ms: u64,
    pub rdap_randomize_headers: bool,
    pub rdap_proxy_host: Option<String>,
    pub rdap_proxy_port: Option<u16>,
    pub rdap_proxy_username: Option<String>,
    pub rdap_proxy_password: Option<String>,
    pub rdap_bootstrap_cache_path: Option<String>,
}

const ENV_MAPPINGS: &[(&str, &str)] = &[
    ("PORT", "port"),
    ("HTTP_PORT", "port"),
    ("CACHE_TTL_SECONDS", "cache_ttl_seconds"),
    ("CACHE_TTL", "cache_ttl_seconds"),
    ("CACHE_MAX_ENTRIES", "cache_max_entries"),
    ("CACHE_SIZE", "cache_max_entries"),
    ("PRECHECK_REACHABILITY", "precheck_reachability"),
    ("RDAP_TIMEOUT_SECONDS", "rdap_timeout_seconds"),
    ("RDAP_RETRIES", "rdap_retries"),
    ("RDAP_RETRY_DELAY_MS", "rdap_retry_delay_ms"),
    ("RDAP_RANDOMIZE_HEADERS", "rdap_randomize_headers"),
    ("RDAP_PROXY_HOST", "rdap_proxy_host"),
    ("RDAP_PROXY_PORT", "rdap_proxy_port"),
    ("RDAP_PROXY_USERNAME", "rdap_proxy_username"),
    ("RDAP_PROXY_PASSWORD", "rdap_proxy_password"),
    ("RDAP_BOOTSTRAP_CACHE_PATH", "rdap_bootstrap_cache_path"),
];

impl ServiceConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load with a custom variable lookup. Later entries in the mapping
    /// table win when aliases are both set.
    pub fn load_with<F>(lookup: F) -> Result<Self, config::ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ClientConfig::default();

        let mut settings = config::Config::builder()
            .set_default("port", 3000)?
            .set_default("cache_ttl_seconds", 3600)?
            .set_default("cache_max_entries", 10_000)?
            .set_default("precheck_reachability", false)?
            .set_default("rdap_timeout_seconds", defaults.timeout.as_secs())?
            .set_default("rdap_retries", defaults.retries)?
            .set_default("rdap_retry_delay_ms", defaults.retry_delay.as_millis() as u64)?
            .set_default("rdap_randomize_headers", defaults.randomize_headers)?;

        for (env_var, config_key) in ENV_MAPPINGS {
            if let Some(value) = lookup(env_var) {
                settings = settings.set_override(*config_key, value)?;
            }
        }

        let data: ConfigData = settings.build()?.try_deserialize()?;
        Self::from_data(data)
    }

    fn from_data(data: ConfigData) -> Result<Self, config::ConfigError> {
        let proxy = match (data.rdap_proxy_host, data.rdap_proxy_port) {
            (Some(host), Some(port)) => {
                let proxy = ProxyConfig::new(host, port);
                Some(match (data.rdap_proxy_username, data.rdap_proxy_password) {
                    (Some(user), Some(pass)) => proxy.with_auth(user, pass),
                    _ => proxy,
                })
            }
            (Some(_), None) => {
                return Err(config::ConfigError::Message(
                    "RDAP_PROXY_HOST is set but RDAP_PROXY_PORT is missing".to_string(),
                ))
            }
            _ => None,
        };

        let client = ClientConfig {
            timeout: Duration::from_secs(data.rdap_timeout_seconds),
            retries: data.rdap_retries,
            retry_delay: Duration::from_millis(data.rdap_retry_delay_ms),
            randomize_headers: data.rdap_randomize_headers,
            proxy,
            bootstrap_cache_path: data.rdap_bootstrap_cache_path.map(PathBuf::from),
        };

        Ok(ServiceConfig {
            port: data.port,
            cache_ttl_seconds: data.cache_ttl_seconds,
            cache_max_entries: data.cache_max_entries,
            precheck_reachability: data.precheck_reachability,
            client,
            start_time: Instant::now(),
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        self.client.clone()
    }
}
