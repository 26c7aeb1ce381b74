use axum::{
    extract::{FromRequestParts, Query, State},
    http::request::Parts,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc, time::Duration, time::Instant};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use rdap_service::{
    cache::CacheService,
    config::ServiceConfig,
    domain::normalize_domain_input,
    errors::RdapError,
    metrics,
    normalize::{self, ContactLine, FormattedSummary, KeyInfo},
    reachability,
    RdapDocument, RdapService,
};

const CACHE_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct AppState {
    rdap_service: Arc<RdapService>,
    cache_service: Arc<CacheService>,
    config: Arc<ServiceConfig>,
}

/// Domain taken from the `/rdap/:domain` path segment and normalized.
#[derive(Debug, Clone)]
pub struct ValidatedDomain(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for ValidatedDomain
where
    S: Send + Sync,
{
    type Rejection = RdapError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let segment = parts
            .uri
            .path()
            .strip_prefix("/rdap/")
            .and_then(|rest| rest.split('/').next())
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| RdapError::InvalidDomain("Domain not found in path".to_string()))?;

        match normalize_domain_input(segment) {
            Ok(domain) => Ok(ValidatedDomain(domain)),
            Err(e) => {
                metrics::increment_errors(e.kind());
                Err(e)
            }
        }
    }
}

#[derive(Deserialize, Default)]
struct LookupParams {
    /// Skip the response cache
    #[serde(default)]
    fresh: bool,
}

#[derive(Serialize)]
struct ContactsResponse {
    #[serde(flatten)]
    info: KeyInfo,
    contacts: Vec<ContactLine>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "rdap_service=info,tower_http=debug".into()),
        )
        .init();

    let config = Arc::new(ServiceConfig::load()?);
    info!("Configuration loaded successfully");

    let rdap_service = Arc::new(RdapService::new(config.client_config())?);
    let cache_service = Arc::new(CacheService::new(
        config.cache_max_entries,
        Duration::from_secs(config.cache_ttl_seconds),
    ));

    metrics::init_metrics();

    let app_state = AppState {
        rdap_service,
        cache_service,
        config: config.clone(),
    };

    let app = Router::new()
        .route("/rdap/:domain", get(rdap_lookup))
        .route("/rdap/:domain/summary", get(rdap_summary))
        .route("/rdap/:domain/contacts", get(rdap_contacts))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!("RDAP service listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("Metrics: http://{}/metrics", addr);
    if config.precheck_reachability {
        info!("Reachability pre-check enabled");
    }

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, gracefully shutting down...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

async fn rdap_lookup(
    ValidatedDomain(domain): ValidatedDomain,
    Query(params): Query<LookupParams>,
    State(state): State<AppState>,
) -> Result<Json<RdapDocument>, RdapError> {
    let doc = fetch_document(&state, &domain, params.fresh).await?;
    Ok(Json(doc.as_ref().clone()))
}

async fn rdap_summary(
    ValidatedDomain(domain): ValidatedDomain,
    Query(params): Query<LookupParams>,
    State(state): State<AppState>,
) -> Result<Json<FormattedSummary>, RdapError> {
    let doc = fetch_document(&state, &domain, params.fresh).await?;
    Ok(Json(normalize::format_summary(&doc)))
}

async fn rdap_contacts(
    ValidatedDomain(domain): ValidatedDomain,
    Query(params): Query<LookupParams>,
    State(state): State<AppState>,
) -> Result<Json<ContactsResponse>, RdapError> {
    let doc = fetch_document(&state, &domain, params.fresh).await?;
    Ok(Json(ContactsResponse {
        info: normalize::key_info(&doc),
        contacts: normalize::contacts(&doc),
    }))
}

// Shared by every route: cache, optional pre-check, query, metrics.
async fn fetch_document(
    state: &AppState,
    domain: &str,
    fresh: bool,
) -> Result<Arc<RdapDocument>, RdapError> {
    let start_time = Instant::now();
    metrics::increment_requests(domain);

    if !fresh {
        if let Some(doc) = state.cache_service.get(domain).await {
            metrics::increment_cache_hits();
            return Ok(doc);
        }
    }

    if state.config.precheck_reachability {
        precheck(state, domain).await?;
    }

    let doc = match state.rdap_service.query_domain(domain, None).await {
        Ok(doc) => Arc::new(doc),
        Err(e) => {
            metrics::increment_errors(e.kind());
            return Err(e);
        }
    };

    handle_cache_write(&state.cache_service, domain, doc.clone()).await;

    metrics::record_query_time(start_time.elapsed());
    metrics::increment_cache_misses();

    Ok(doc)
}

async fn precheck(state: &AppState, domain: &str) -> Result<(), RdapError> {
    if !reachability::domain_exists(domain).await {
        metrics::increment_errors("domain_not_resolvable");
        return Err(RdapError::Http {
            status: 404,
            reason: format!("{} does not resolve", domain),
        });
    }
    if !reachability::site_is_reachable(state.rdap_service.http_client(), domain).await {
        metrics::increment_errors("site_unreachable");
        return Err(RdapError::Http {
            status: 404,
            reason: format!("{} is not reachable", domain),
        });
    }
    Ok(())
}

async fn handle_cache_write(cache_service: &CacheService, domain: &str, doc: Arc<RdapDocument>) {
    if tokio::time::timeout(CACHE_WRITE_TIMEOUT, cache_service.set(domain, doc))
        .await
        .is_err()
    {
        warn!("Cache write timeout for {}", domain);
        metrics::increment_errors("cache_write_timeout");
    }
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.config.start_time.elapsed().as_secs(),
    })
}
