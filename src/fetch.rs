use std::sync::Arc;

use tracing::info;
use url::Url;

use crate::config::Config;
use crate::error::ServiceError;
use crate::extract;
use crate::types::PageContent;
use crate::AppState;

/// Fetch an intranet page by URL or identifier and normalize it.
pub async fn fetch_page(
    state: &Arc<AppState>,
    identifier: &str,
) -> Result<PageContent, ServiceError> {
    let url = resolve_identifier(&state.config, identifier)?;
    info!("Fetching intranet page: {}", url);

    let request = state
        .config
        .credentials
        .apply(state.http_client.get(url.clone()));
    let response = request.send().await.map_err(ServiceError::from_transport)?;

    let status = response.status();
    if let Some(err) = classify_fetch_status(status.as_u16(), url.as_str()) {
        return Err(err);
    }

    let body = response
        .text()
        .await
        .map_err(ServiceError::from_transport)?;
    let page = extract::extract_page_content(
        &body,
        identifier,
        url.as_str(),
        state.config.max_text_length,
    )?;
    info!(
        "Extracted page content: title='{}', text_length={}",
        page.title,
        page.text.len()
    );
    Ok(page)
}

/// Resolve a caller-supplied identifier to a concrete URL. Absolute http(s)
/// URLs pass through; bare identifiers are joined onto the configured page
/// base; anything else is the caller's fault.
pub fn resolve_identifier(config: &Config, identifier: &str) -> Result<Url, ServiceError> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidArgument(
            "page identifier must not be empty".into(),
        ));
    }

    match Url::parse(trimmed) {
        Ok(url) => {
            if url.scheme() == "http" || url.scheme() == "https" {
                Ok(url)
            } else {
                Err(ServiceError::InvalidArgument(format!(
                    "unsupported URL scheme '{}' in '{trimmed}'",
                    url.scheme()
                )))
            }
        }
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            config.page_base_url.join(trimmed).map_err(|e| {
                ServiceError::InvalidArgument(format!("unresolvable identifier '{trimmed}': {e}"))
            })
        }
        Err(e) => Err(ServiceError::InvalidArgument(format!(
            "malformed identifier '{trimmed}': {e}"
        ))),
    }
}

/// Map a non-2xx page status onto the error taxonomy. 4xx means the page is
/// not there for us; auth rejections are reported separately.
fn classify_fetch_status(status: u16, url: &str) -> Option<ServiceError> {
    match status {
        200..=299 => None,
        401 | 403 | 407 => Some(ServiceError::AuthenticationFailed(format!(
            "intranet rejected credentials for {url} (HTTP {status})"
        ))),
        400..=499 => Some(ServiceError::ContentNotFound(format!(
            "page not available: {url} (HTTP {status})"
        ))),
        _ => Some(ServiceError::UpstreamUnavailable(format!(
            "intranet error fetching {url} (HTTP {status})"
        ))),
    }
}
