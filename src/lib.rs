pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod mcp;
pub mod search;
pub mod stdio_service;
pub mod types;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, USER_AGENT};

use config::Config;
use error::ServiceError;

// Re-export the canonical records for easy access
pub use types::*;

/// Headers the intranet gateway expects from a browser-like client.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36 Edg/139.0.0.0";

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Config,
    pub http_client: reqwest::Client,
}

impl AppState {
    /// Build the shared state from resolved configuration: one pooled HTTP
    /// client per process, timeout and headers fixed up front.
    pub fn new(config: Config) -> Result<Self, ServiceError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.8,*/*;q=0.7",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                ServiceError::InvalidConfiguration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }
}
