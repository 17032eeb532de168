use std::collections::HashMap;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::ServiceError;
use crate::types::{PageContent, SearchResult, SolrDoc, SolrHighlight, SolrResponse};

/// Subtrees that never contribute readable content.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "nav"];

/// Map a Solr payload to canonical search results.
///
/// Records without a resolvable URL are dropped rather than surfaced with an
/// empty one; partial results beat failing the whole query. Backend relevance
/// order is preserved.
pub fn extract_search_results(payload: &SolrResponse) -> Vec<SearchResult> {
    let mut results = Vec::with_capacity(payload.response.docs.len());
    for doc in &payload.response.docs {
        let url = doc.url.as_deref().map(str::trim).unwrap_or("");
        if url.is_empty() {
            debug!("Dropping search record without a resolvable URL: id={:?}", doc.id);
            continue;
        }
        let id = doc
            .id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(url);
        let title = doc.title.as_deref().unwrap_or("").trim().to_string();
        let snippet = clean_snippet(raw_snippet(doc, &payload.highlighting));
        results.push(SearchResult {
            id: id.to_string(),
            title,
            snippet,
            url: url.to_string(),
        });
    }
    results
}

/// Prefer the highlighted fragment for the doc, fall back to its description.
fn raw_snippet<'a>(doc: &'a SolrDoc, highlighting: &'a HashMap<String, SolrHighlight>) -> &'a str {
    if let Some(id) = doc.id.as_deref() {
        if let Some(highlight) = highlighting.get(id) {
            if let Some(fragment) = highlight.content.first() {
                if !fragment.is_empty() {
                    return fragment;
                }
            }
        }
    }
    doc.description.first().map(String::as_str).unwrap_or("")
}

/// Strip highlight markers and decode entities from a snippet fragment.
pub fn clean_snippet(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(raw);
    collapse_whitespace(&fragment.root_element().text().collect::<String>())
}

/// Normalize a fetched HTML body into a `PageContent`.
///
/// Parsing is lenient: malformed markup still yields best-effort text. Only a
/// completely empty body is treated as missing content.
pub fn extract_page_content(
    html: &str,
    id: &str,
    url: &str,
    max_text_length: Option<usize>,
) -> Result<PageContent, ServiceError> {
    if html.trim().is_empty() {
        return Err(ServiceError::ContentNotFound(format!(
            "empty response body for '{id}'"
        )));
    }

    let document = Html::parse_document(html);
    let root = content_root(&document);
    let title = extract_title(&document, root, id);
    let mut text = flatten_text(root);
    if let Some(limit) = max_text_length {
        text = truncate_at_boundary(&text, limit);
    }

    Ok(PageContent {
        id: id.to_string(),
        title,
        text,
        url: url.to_string(),
    })
}

/// Pick the most specific content container the page offers. CDC intranet
/// templates put the readable body under `<main role="main">`.
fn content_root(document: &Html) -> ElementRef<'_> {
    for selector in ["main[role=\"main\"]", "main", "body"] {
        if let Ok(selector) = Selector::parse(selector) {
            if let Some(element) = document.select(&selector).next() {
                return element;
            }
        }
    }
    document.root_element()
}

/// Title from the first `<h1>` in the content area, then the document
/// `<title>`, then the caller-supplied identifier.
fn extract_title(document: &Html, root: ElementRef<'_>, fallback: &str) -> String {
    if let Ok(selector) = Selector::parse("h1") {
        if let Some(heading) = root.select(&selector).next() {
            let text = collapse_whitespace(&heading.text().collect::<String>());
            if !text.is_empty() {
                return text;
            }
        }
    }
    if let Ok(selector) = Selector::parse("title") {
        if let Some(title) = document.select(&selector).next() {
            let text = collapse_whitespace(&title.text().collect::<String>());
            if !text.is_empty() {
                return text;
            }
        }
    }
    fallback.to_string()
}

/// Flatten the subtree to whitespace-separated plain text, preserving
/// document order and skipping non-content elements.
fn flatten_text(root: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    collect_text(root, &mut parts);
    collapse_whitespace(&parts.join(" "))
}

fn collect_text(element: ElementRef<'_>, parts: &mut Vec<String>) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if SKIPPED_ELEMENTS.contains(&child_element.value().name()) {
                continue;
            }
            collect_text(child_element, parts);
        } else if let Some(text) = child.value().as_text() {
            parts.push(text.text.to_string());
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max_len` bytes without splitting a UTF-8 character,
/// preferring the last whitespace boundary inside the limit.
pub fn truncate_at_boundary(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut cut = max_len;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let kept = &text[..cut];
    match kept.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => kept[..pos].trim_end().to_string(),
        _ => kept.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn solr(payload: serde_json::Value) -> SolrResponse {
        serde_json::from_value(payload).expect("payload should deserialize")
    }

    #[test]
    fn maps_docs_in_backend_order() {
        let payload = solr(json!({
            "response": {
                "numFound": 2,
                "docs": [
                    {"id": "a", "url": "https://intranet.cdc.gov/a.html", "title": "A",
                     "description": ["first hit"]},
                    {"id": "b", "url": "https://intranet.cdc.gov/b.html", "title": "B",
                     "description": ["second hit"]},
                ]
            },
            "highlighting": {}
        }));
        let results = extract_search_results(&payload);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a");
        assert_eq!(results[0].snippet, "first hit");
        assert_eq!(results[1].id, "b");
    }

    #[test]
    fn drops_records_without_url() {
        let payload = solr(json!({
            "response": {
                "docs": [
                    {"id": "keep", "url": "https://intranet.cdc.gov/keep.html", "title": "Keep"},
                    {"id": "no-url", "title": "Dropped"},
                    {"id": "blank-url", "url": "   ", "title": "Dropped too"},
                ]
            }
        }));
        let results = extract_search_results(&payload);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "keep");
        for result in &results {
            assert!(!result.id.is_empty());
            assert!(!result.url.is_empty());
        }
    }

    #[test]
    fn id_falls_back_to_url() {
        let payload = solr(json!({
            "response": {
                "docs": [{"url": "https://intranet.cdc.gov/page.html", "title": "No id"}]
            }
        }));
        let results = extract_search_results(&payload);
        assert_eq!(results[0].id, "https://intranet.cdc.gov/page.html");
    }

    #[test]
    fn highlighting_wins_over_description() {
        let payload = solr(json!({
            "response": {
                "docs": [{"id": "doc1", "url": "https://intranet.cdc.gov/doc1.html",
                          "title": "Doc", "description": ["plain description"]}]
            },
            "highlighting": {
                "doc1": {"content": ["Vaccine <b>guidance</b> &amp; policy"]}
            }
        }));
        let results = extract_search_results(&payload);
        assert_eq!(results[0].snippet, "Vaccine guidance & policy");
    }

    #[test]
    fn missing_snippet_sources_yield_empty_snippet() {
        let payload = solr(json!({
            "response": {
                "docs": [{"id": "bare", "url": "https://intranet.cdc.gov/bare.html"}]
            }
        }));
        let results = extract_search_results(&payload);
        assert_eq!(results[0].snippet, "");
        assert_eq!(results[0].title, "");
    }

    #[test]
    fn zero_docs_is_an_empty_sequence() {
        let payload = solr(json!({"response": {"numFound": 0, "docs": []}}));
        assert!(extract_search_results(&payload).is_empty());
    }

    #[test]
    fn extracts_title_and_strips_scripts() {
        let html = "<html><head><title>T</title></head><body>\
                    <p>Hello &amp; welcome.</p><script>evil()</script></body></html>";
        let page = extract_page_content(html, "page-1", "https://intranet.cdc.gov/p", None).unwrap();
        assert_eq!(page.title, "T");
        assert!(page.text.contains("Hello & welcome."));
        assert!(!page.text.contains("evil()"));
    }

    #[test]
    fn scopes_to_main_role_and_prefers_its_h1() {
        let html = r#"<html><head><title>Site chrome</title></head><body>
            <nav><a href="/">Home</a><a href="/atoz">A-Z index</a></nav>
            <div class="banner">Global banner</div>
            <main role="main">
              <h1>Interim Guidance</h1>
              <p>Applies to all facilities.</p>
            </main>
            <footer>Contact us</footer>
          </body></html>"#;
        let page = extract_page_content(html, "id", "https://intranet.cdc.gov/g", None).unwrap();
        assert_eq!(page.title, "Interim Guidance");
        assert!(page.text.contains("Applies to all facilities."));
        assert!(!page.text.contains("A-Z index"));
        assert!(!page.text.contains("Global banner"));
    }

    #[test]
    fn navigation_is_stripped_even_without_main() {
        let html = "<html><body><nav>Menu Menu Menu</nav><p>Body copy</p></body></html>";
        let page = extract_page_content(html, "id", "https://example.gov/x", None).unwrap();
        assert!(page.text.contains("Body copy"));
        assert!(!page.text.contains("Menu"));
    }

    #[test]
    fn preserves_block_order_and_collapses_whitespace() {
        let html = "<html><body><p>first\n\n  block</p><div>second</div><p>third</p></body></html>";
        let page = extract_page_content(html, "id", "https://example.gov/x", None).unwrap();
        assert_eq!(page.text, "first block second third");
    }

    #[test]
    fn malformed_markup_still_extracts() {
        let html = "<html><body><p>Unclosed paragraph <div>Still <b>readable";
        let page = extract_page_content(html, "id", "https://example.gov/x", None).unwrap();
        assert!(page.text.contains("Unclosed paragraph"));
        assert!(page.text.contains("Still readable"));
    }

    #[test]
    fn non_html_body_is_best_effort() {
        let page =
            extract_page_content("%PDF-1.7 stream garbage", "id", "https://example.gov/x", None)
                .unwrap();
        assert!(!page.text.is_empty());
        assert_eq!(page.title, "id");
    }

    #[test]
    fn empty_body_is_content_not_found() {
        let err = extract_page_content("   \n ", "id", "https://example.gov/x", None).unwrap_err();
        assert!(matches!(err, ServiceError::ContentNotFound(_)));
    }

    #[test]
    fn title_falls_back_to_identifier() {
        let html = "<html><body><p>text only</p></body></html>";
        let page = extract_page_content(html, "fallback-id", "https://example.gov/x", None).unwrap();
        assert_eq!(page.title, "fallback-id");
    }

    #[test]
    fn extraction_is_idempotent() {
        let html = "<html><head><title>Stable</title></head><body>\
                    <main role=\"main\"><h1>Stable</h1><p>Same content.</p></main></body></html>";
        let first = extract_page_content(html, "id", "https://example.gov/x", None).unwrap();
        let second = extract_page_content(html, "id", "https://example.gov/x", None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn truncation_respects_configured_limit() {
        let html = "<html><body><p>abcdefghijklmnop</p></body></html>";
        let page =
            extract_page_content(html, "id", "https://example.gov/x", Some(10)).unwrap();
        assert!(page.text.len() <= 10);
        assert_eq!(page.text, "abcdefghij");
    }

    #[test]
    fn truncation_prefers_whitespace_boundary() {
        assert_eq!(truncate_at_boundary("hello world foo", 13), "hello world");
        assert_eq!(truncate_at_boundary("short", 10), "short");
    }

    #[test]
    fn truncation_never_splits_a_character() {
        // Each character below is three bytes; 10 is not a boundary.
        let text = "日本語のテキスト";
        let truncated = truncate_at_boundary(text, 10);
        assert_eq!(truncated, "日本語");
        assert!(truncated.len() <= 10);
    }

    #[test]
    fn snippet_cleaning_handles_markers_and_entities() {
        assert_eq!(
            clean_snippet("Influenza <b>testing</b> &amp; reporting"),
            "Influenza testing & reporting"
        );
        assert_eq!(clean_snippet(""), "");
    }
}
