use crate::error::ServiceError;
use crate::types::*;
use crate::{fetch, search, AppState};
use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct McpToolsResponse {
    pub tools: Vec<McpTool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct McpCallRequest {
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct McpCallResponse {
    pub content: Vec<McpContent>,
    pub is_error: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct McpContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

pub async fn list_tools() -> Json<McpToolsResponse> {
    let tools = vec![
        McpTool {
            name: "search_cdc_intranet".to_string(),
            description: "Search engine for sites on the CDC internal web (intranet). Returns a list of results with titles, snippets and URLs.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Natural language search query"
                    }
                },
                "required": ["query"]
            }),
        },
        McpTool {
            name: "fetch_cdc_intranet".to_string(),
            description: "Fetch the full contents of a CDC intranet page by URL or identifier from a previous search result.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "string",
                        "description": "The URL or identifier of the page to fetch"
                    }
                },
                "required": ["id"]
            }),
        },
    ];

    Json(McpToolsResponse { tools })
}

pub async fn call_tool(
    State(state): State<Arc<AppState>>,
    Json(request): Json<McpCallRequest>,
) -> Result<Json<McpCallResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!("MCP tool call: {} with args: {:?}", request.name, request.arguments);

    match request.name.as_str() {
        "search_cdc_intranet" => {
            let query = request
                .arguments
                .get("query")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(ErrorResponse {
                            kind: "invalid_argument".to_string(),
                            error: "Missing required parameter: query".to_string(),
                        }),
                    )
                })?;

            match search::search_intranet(&state, query).await {
                Ok(results) => Ok(Json(tool_response(&SearchResponse { results }))),
                Err(e) => {
                    error!("Search tool error: {}", e);
                    Ok(Json(error_response(&e)))
                }
            }
        }
        "fetch_cdc_intranet" => {
            let id = request
                .arguments
                .get("id")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(ErrorResponse {
                            kind: "invalid_argument".to_string(),
                            error: "Missing required parameter: id".to_string(),
                        }),
                    )
                })?;

            match fetch::fetch_page(&state, id).await {
                Ok(page) => Ok(Json(tool_response(&page))),
                Err(e) => {
                    error!("Fetch tool error: {}", e);
                    Ok(Json(error_response(&e)))
                }
            }
        }
        _ => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                kind: "invalid_argument".to_string(),
                error: format!("Unknown tool: {}", request.name),
            }),
        )),
    }
}

/// Wrap a canonical record in the MCP content envelope.
fn tool_response<T: Serialize>(payload: &T) -> McpCallResponse {
    let text = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
    McpCallResponse {
        content: vec![McpContent {
            content_type: "text".to_string(),
            text,
        }],
        is_error: false,
    }
}

/// Per-call failures travel back as structured error content, not transport
/// errors, so MCP clients can surface them.
fn error_response(err: &ServiceError) -> McpCallResponse {
    let text = serde_json::to_string(&ErrorResponse {
        kind: err.kind().to_string(),
        error: err.to_string(),
    })
    .unwrap_or_else(|_| "{}".to_string());
    McpCallResponse {
        content: vec![McpContent {
            content_type: "text".to_string(),
            text,
        }],
        is_error: true,
    }
}
