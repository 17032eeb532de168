use std::sync::Arc;

use tracing::{debug, info};

use crate::error::ServiceError;
use crate::extract;
use crate::types::{SearchResult, SolrResponse};
use crate::AppState;

/// Search the intranet through the Solr browse endpoint and normalize the
/// payload into canonical results.
pub async fn search_intranet(
    state: &Arc<AppState>,
    query: &str,
) -> Result<Vec<SearchResult>, ServiceError> {
    if query.trim().is_empty() {
        return Err(ServiceError::InvalidArgument(
            "search query must not be empty".into(),
        ));
    }

    info!("Searching intranet: query='{}'", query);
    let url = format!("{}/browse2-nodoc", state.config.search_base_url);
    let rows = state.config.result_limit.to_string();
    // Parameter set the browse endpoint expects: JSON writer, the fields the
    // extractor consumes, and unified highlighting for snippets.
    let params: &[(&str, &str)] = &[
        ("q", query),
        ("wt", "json"),
        ("start", "0"),
        ("rows", rows.as_str()),
        ("fl", "id,url,title,description"),
        ("hl", "on"),
        ("hl.simple.pre", "<b>"),
        ("hl.simple.post", "</b>"),
        ("hl.defaultSummary", "true"),
        ("hl.snippets", "1"),
        ("hl.method", "unified"),
        ("hl.fragsize", "300"),
        ("hl.fl", "content,description"),
        ("echoParams", "none"),
        ("indent", "false"),
    ];
    debug!("Search URL: {}", url);

    let request = state
        .config
        .credentials
        .apply(state.http_client.get(&url).query(params));
    let response = request.send().await.map_err(ServiceError::from_transport)?;

    let status = response.status();
    if let Some(err) = classify_search_status(status.as_u16()) {
        return Err(err);
    }

    let payload: SolrResponse = response.json().await.map_err(|e| {
        ServiceError::UpstreamProtocolError(format!("search response is not valid Solr JSON: {e}"))
    })?;

    let results = extract::extract_search_results(&payload);
    info!(
        "Search completed: {} of {} indexed results for '{}'",
        results.len(),
        payload.response.num_found,
        query
    );
    Ok(results)
}

/// Map a non-2xx search backend status onto the error taxonomy.
fn classify_search_status(status: u16) -> Option<ServiceError> {
    match status {
        200..=299 => None,
        401 | 403 | 407 => Some(ServiceError::AuthenticationFailed(format!(
            "search backend rejected credentials (HTTP {status})"
        ))),
        500..=599 => Some(ServiceError::UpstreamUnavailable(format!(
            "search backend error (HTTP {status})"
        ))),
        _ => Some(ServiceError::UpstreamProtocolError(format!(
            "search backend rejected the request (HTTP {status})"
        ))),
    }
}
