use axum::http::StatusCode;
use thiserror::Error;

/// Error taxonomy for the search/fetch service.
///
/// `InvalidConfiguration` is only produced while resolving configuration at
/// startup; every other variant is a per-call failure returned to the caller.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("upstream protocol error: {0}")]
    UpstreamProtocolError(String),

    #[error("content not found: {0}")]
    ContentNotFound(String),
}

impl ServiceError {
    /// Stable machine-readable kind, serialized alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::InvalidArgument(_) => "invalid_argument",
            ServiceError::InvalidConfiguration(_) => "invalid_configuration",
            ServiceError::AuthenticationFailed(_) => "authentication_failed",
            ServiceError::UpstreamUnavailable(_) => "upstream_unavailable",
            ServiceError::UpstreamProtocolError(_) => "upstream_protocol_error",
            ServiceError::ContentNotFound(_) => "content_not_found",
        }
    }

    /// HTTP status for the inbound axum surface.
    pub fn http_status(&self) -> StatusCode {
        match self {
            ServiceError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ServiceError::InvalidConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::ContentNotFound(_) => StatusCode::NOT_FOUND,
            // The backend rejected us, not the caller.
            ServiceError::AuthenticationFailed(_)
            | ServiceError::UpstreamUnavailable(_)
            | ServiceError::UpstreamProtocolError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Classify a reqwest transport failure (no HTTP status was received).
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::UpstreamUnavailable(format!("request timed out: {err}"))
        } else if err.is_connect() {
            ServiceError::UpstreamUnavailable(format!("connection failed: {err}"))
        } else {
            ServiceError::UpstreamUnavailable(format!("transport error: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_status_agree_on_caller_vs_upstream_faults() {
        let bad_arg = ServiceError::InvalidArgument("empty query".into());
        assert_eq!(bad_arg.kind(), "invalid_argument");
        assert_eq!(bad_arg.http_status(), StatusCode::BAD_REQUEST);

        let missing = ServiceError::ContentNotFound("gone".into());
        assert_eq!(missing.http_status(), StatusCode::NOT_FOUND);

        let down = ServiceError::UpstreamUnavailable("refused".into());
        assert_eq!(down.http_status(), StatusCode::BAD_GATEWAY);
    }
}
