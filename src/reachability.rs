//! Cheap liveness checks run before an RDAP query.
//!
//! Neither check returns an error. A failure of any kind reads as "no".

use tracing::debug;

/// Whether `domain` resolves to at least one address.
pub async fn domain_exists(domain: &str) -> bool {
    match tokio::net::lookup_host((domain, 443)).await {
        Ok(mut addrs) => addrs.next().is_some(),
        Err(e) => {
            debug!("DNS lookup failed for {}: {}", domain, e);
            false
        }
    }
}

/// Whether `https://{domain}` answers a HEAD request with a success status.
pub async fn site_is_reachable(client: &reqwest::Client, domain: &str) -> bool {
    site_answers(client, &format!("https://{}", domain)).await
}

async fn site_answers(client: &reqwest::Client, url: &str) -> bool {
    match client.head(url).send().await {
        Ok(response) => {
            let ok = response.status().is_success();
            debug!("HEAD {} -> {}", url, response.status());
            ok
        }
        Err(e) => {
            debug!("HEAD {} failed: {}", url, e);
            false
        }
    }
}
