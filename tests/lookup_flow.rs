//! End-to-end lookups against a local fake of IANA and an RDAP server.

use httpmock::prelude::*;
use rdap_service::{
    bootstrap::{BootstrapCache, HttpBootstrapSource, DEFAULT_CACHE_FILE},
    format_summary,
    resolver::ServerResolver,
    ClientConfig, RdapError, RdapService,
};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio_test::{assert_err, assert_ok};

fn service(server: &MockServer, dir: &tempfile::TempDir) -> RdapService {
    let source = HttpBootstrapSource::with_url(server.url("/rdap/dns.json"), None).unwrap();
    let cache = BootstrapCache::with_source(dir.path().join(DEFAULT_CACHE_FILE), Arc::new(source));
    let config = ClientConfig::default()
        .retries(1)
        .retry_delay(Duration::from_millis(5))
        .timeout(Duration::from_secs(5));
    RdapService::with_resolver(config, ServerResolver::new(cache)).unwrap()
}

fn mock_bootstrap(server: &MockServer) -> httpmock::Mock<'_> {
    let registry = json!({
        "version": "1.0",
        "services": [
            [["example", "test"], [server.url("/registry/")]]
        ]
    });
    server.mock(|when, then| {
        when.method(GET).path("/rdap/dns.json");
        then.status(200).json_body(registry);
    })
}

#[tokio::test]
async fn test_bootstrap_is_fetched_once_then_served_from_disk() {
    let server = MockServer::start();
    let bootstrap = mock_bootstrap(&server);
    let domain = server.mock(|when, then| {
        when.method(GET).path("/registry/domain/acme.example");
        then.status(200)
            .header("content-type", "application/rdap+json")
            .json_body(json!({
                "objectClassName": "domain",
                "ldhName": "acme.example",
                "status": ["active", "client transfer prohibited"],
                "events": [
                    { "eventAction": "registration", "eventDate": "2001-02-03T04:05:06Z" },
                    { "eventAction": "expiration", "eventDate": "2030-02-03T04:05:06Z" }
                ],
                "entities": [{
                    "handle": "REG-1",
                    "roles": ["registrar"],
                    "vcardArray": ["vcard", [
                        ["version", {}, "text", "4.0"],
                        ["fn", {}, "text", "Acme Registrar"],
                        ["email", {}, "text", "abuse@acme.example"]
                    ]]
                }],
                "nameservers": [
                    { "objectClassName": "nameserver", "ldhName": "ns1.acme.example" }
                ],
                "notices": [{ "title": "Terms of Use", "description": ["Be nice."] }]
            }));
    });

    let dir = tempfile::tempdir().unwrap();
    let service = service(&server, &dir);

    let doc = assert_ok!(service.query_domain("acme.example", None).await);
    assert_eq!(bootstrap.calls(), 1);
    assert!(dir.path().join(DEFAULT_CACHE_FILE).exists());

    let summary = format_summary(&doc);
    assert_eq!(summary.events["registration"], "2001-02-03T04:05:06.000Z");
    let registrar = &summary.contacts["registrar"];
    assert_eq!(registrar.handle.as_deref(), Some("REG-1"));
    assert_eq!(registrar.contact.email.as_deref(), Some("abuse@acme.example"));

    // a second service over the same directory reuses the cache file
    let again = self::service(&server, &dir);
    assert_ok!(again.query_domain("acme.example", None).await);
    assert_eq!(bootstrap.calls(), 1);
    assert_eq!(domain.calls(), 2);
}

#[tokio::test]
async fn test_rdap_errors_surface_after_retries() {
    let server = MockServer::start();
    mock_bootstrap(&server);
    let domain = server.mock(|when, then| {
        when.method(GET).path("/registry/domain/gone.test");
        then.status(404);
    });

    let dir = tempfile::tempdir().unwrap();
    let service = service(&server, &dir);

    let err = assert_err!(service.query_domain("gone.test", None).await);
    assert!(matches!(err, RdapError::Http { status: 404, .. }));
    assert_eq!(domain.calls(), 2);
}

#[tokio::test]
async fn test_bootstrap_outage_without_cache_is_a_fetch_error() {
    let server = MockServer::start();
    let bootstrap = server.mock(|when, then| {
        when.method(GET).path("/rdap/dns.json");
        then.status(500);
    });

    let dir = tempfile::tempdir().unwrap();
    let service = service(&server, &dir);

    let err = assert_err!(service.query_domain("acme.example", None).await);
    assert!(matches!(err, RdapError::Fetch(_)), "got {:?}", err);
    assert_eq!(bootstrap.calls(), 1);
    assert!(!dir.path().join(DEFAULT_CACHE_FILE).exists());
}
