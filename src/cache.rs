use crate::document::RdapDocument;
use moka::future::Cache;
use std::{sync::Arc, time::Duration};
use tracing::debug;

/// In-memory document cache keyed by normalized domain.
pub struct CacheService {
    cache: Cache<String, Arc<RdapDocument>>,
}

impl CacheService {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub async fn get(&self, domain: &str) -> Option<Arc<RdapDocument>> {
        let key = normalize_key(domain);

        match self.cache.get(&key).await {
            Some(doc) => {
                debug!("Cache hit for domain: {}", domain);
                Some(doc)
            }
            None => {
                debug!("Cache miss for domain: {}", domain);
                None
            }
        }
    }

    pub async fn set(&self, domain: &str, doc: Arc<RdapDocument>) {
        let key = normalize_key(domain);
        self.cache.insert(key, doc).await;
        debug!("Cached RDAP document for domain: {}", domain);
    }

    pub async fn invalidate(&self, domain: &str) {
        self.cache.invalidate(&normalize_key(domain)).await;
    }
}

fn normalize_key(domain: &str) -> String {
    let normalized = domain.trim().to_lowercase();
    match normalized.strip_suffix('.') {
        Some(stripped) => stripped.to_string(),
        None => normalized,
    }
}
