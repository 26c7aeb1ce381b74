//! Randomized request headers.
//!
//! Every call builds an independent, browser-shaped header set so repeated
//! RDAP queries do not share one static fingerprint. This is diversification
//! only and gives no anonymity guarantee.

use rand::{seq::SliceRandom, Rng};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;

pub const RDAP_ACCEPT: &str = "application/rdap+json, application/json, */*";
pub const SESSION_HEADER: &str = "X-Session-Id";

const SESSION_ID_BYTES: usize = 16;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/120.0.0.0",
];

// `None` entries mean the header is left out.
const REFERERS: &[Option<&str>] = &[
    Some("https://www.google.com/"),
    Some("https://www.bing.com/"),
    Some("https://duckduckgo.com/"),
    Some("https://www.yahoo.com/"),
    Some("https://registro.br/"),
    Some("https://www.whois.com/"),
    Some("https://who.is/"),
    None,
];

const ORIGINS: &[Option<&str>] = &[
    Some("https://www.google.com"),
    Some("https://registro.br"),
    Some("https://www.whois.com"),
    Some("https://who.is"),
    None,
];

const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "pt-BR,pt;q=0.9,en;q=0.8",
    "en-GB,en;q=0.9",
    "es-ES,es;q=0.9,en;q=0.8",
    "fr-FR,fr;q=0.9,en;q=0.8",
];

// only encodings the reqwest client can decode
const ACCEPT_ENCODINGS: &[&str] = &["gzip, deflate, br", "gzip, deflate", "gzip, br"];

/// An ordered header name -> value mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet(BTreeMap<String, String>);

impl HeaderSet {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_string(), value.into());
    }

    /// Headers sent when randomization is turned off.
    pub fn static_defaults() -> Self {
        let mut headers = Self::default();
        headers.insert("User-Agent", "RDAP-Client/1.0");
        headers.insert("Accept", "application/rdap+json, application/json");
        headers
    }

    /// Convert into a reqwest header map. Entries that are not valid header
    /// names or values are skipped.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.0.len());
        for (name, value) in &self.0 {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    map.insert(name, value);
                }
                _ => tracing::debug!("Skipping unrepresentable header {}", name),
            }
        }
        map
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderRandomizer;

impl HeaderRandomizer {
    pub fn new() -> Self {
        Self
    }

    /// Generate a header set from the thread-local RNG.
    pub fn generate(&self) -> HeaderSet {
        self.generate_with(&mut rand::thread_rng())
    }

    /// Generate a header set from a caller-supplied random source.
    pub fn generate_with<R: Rng>(&self, rng: &mut R) -> HeaderSet {
        let mut headers = HeaderSet::default();

        headers.insert("User-Agent", pick(USER_AGENTS, rng));
        headers.insert("Accept", RDAP_ACCEPT);
        headers.insert("Accept-Language", pick(ACCEPT_LANGUAGES, rng));
        headers.insert("Accept-Encoding", pick(ACCEPT_ENCODINGS, rng));
        headers.insert("Cache-Control", "no-cache");
        headers.insert("Pragma", "no-cache");
        headers.insert("DNT", if rng.gen_bool(0.5) { "1" } else { "0" });
        headers.insert("Upgrade-Insecure-Requests", "1");
        headers.insert("Sec-Fetch-Dest", "document");
        headers.insert("Sec-Fetch-Mode", "navigate");
        headers.insert("Sec-Fetch-Site", "none");
        headers.insert("Sec-Fetch-User", "?1");

        if let Some(referer) = pick(REFERERS, rng) {
            headers.insert("Referer", referer);
        }
        if let Some(origin) = pick(ORIGINS, rng) {
            headers.insert("Origin", origin);
        }

        let mut session = [0u8; SESSION_ID_BYTES];
        rng.fill(&mut session[..]);
        headers.insert(SESSION_HEADER, hex::encode(session));

        headers
    }
}

fn pick<T: Copy, R: Rng>(pool: &[T], rng: &mut R) -> T {
    // pools are non-empty constants
    *pool.choose(rng).unwrap_or(&pool[0])
}
