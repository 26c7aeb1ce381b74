#[cfg(feature = "server")]
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
#[cfg(feature = "server")]
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RdapError {
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Bootstrap registry unavailable: {0}")]
    Fetch(String),

    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    #[error("Network timeout")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid RDAP response: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<tokio::time::error::Elapsed> for RdapError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        RdapError::Timeout
    }
}

impl RdapError {
    /// Short, stable label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RdapError::InvalidDomain(_) => "invalid_domain",
            RdapError::Fetch(_) => "bootstrap_fetch",
            RdapError::Http { .. } => "http_status",
            RdapError::Timeout => "timeout",
            RdapError::Transport(e) if e.is_timeout() => "timeout",
            RdapError::Transport(_) => "transport",
            RdapError::Parse(_) => "parse",
            RdapError::Io(_) => "io_error",
            RdapError::Json(_) => "json",
            RdapError::InvalidUrl(_) => "invalid_url",
            RdapError::Config(_) => "config",
            RdapError::Internal(_) => "other",
        }
    }
}

#[cfg(feature = "server")]
impl IntoResponse for RdapError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            RdapError::InvalidDomain(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            RdapError::Http { status: 404, .. } => (StatusCode::NOT_FOUND, self.to_string()),
            RdapError::Http { .. } | RdapError::Transport(_) | RdapError::Parse(_) => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            RdapError::Fetch(_) => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            RdapError::Timeout => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string()),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = RdapError::Http {
            status: 429,
            reason: "Too Many Requests".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 429: Too Many Requests");
        assert_eq!(err.kind(), "http_status");
    }

    #[tokio::test]
    async fn test_elapsed_maps_to_timeout() {
        let elapsed = tokio::time::timeout(
            std::time::Duration::from_millis(1),
            std::future::pending::<()>(),
        )
        .await
        .unwrap_err();
        let err: RdapError = elapsed.into();
        assert!(matches!(err, RdapError::Timeout));
    }
}
