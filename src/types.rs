use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

/// One normalized search hit. `id` and `url` are always non-empty; records
/// the backend returns without a resolvable URL are dropped during
/// extraction instead of being propagated here.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub snippet: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FetchRequest {
    pub id: String,
}

/// Normalized page body. `text` is plain text: markup stripped, entities
/// decoded, whitespace collapsed, source block order preserved.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct PageContent {
    pub id: String,
    pub title: String,
    pub text: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: String,
    pub error: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchToolParams {
    /// Natural language search query.
    pub query: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FetchToolParams {
    /// URL or page identifier from a previous search result.
    pub id: String,
}

// Solr API types. Field presence varies across the index, so everything the
// backend might omit is optional or defaulted.
#[derive(Debug, Deserialize)]
pub struct SolrResponse {
    #[serde(default)]
    pub response: SolrDocSet,
    #[serde(default)]
    pub highlighting: HashMap<String, SolrHighlight>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SolrDocSet {
    #[serde(rename = "numFound", default)]
    pub num_found: u64,
    #[serde(default)]
    pub docs: Vec<SolrDoc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SolrDoc {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SolrHighlight {
    #[serde(default)]
    pub content: Vec<String>,
}
