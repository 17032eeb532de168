use rmcp::{model::*, ServiceExt};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::Config;
use crate::error::ServiceError;
use crate::types::{ErrorResponse, FetchToolParams, SearchResponse, SearchToolParams};
use crate::{fetch, search, AppState};

#[derive(Clone, Debug)]
pub struct McpService {
    pub state: Arc<AppState>,
}

impl McpService {
    pub fn new() -> anyhow::Result<Self> {
        // Initialize tracing
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();

        info!("Starting CDC intranet MCP service");

        // InvalidConfiguration is fatal here, before any tool call is served.
        let config = Config::from_env()?;
        let state = Arc::new(AppState::new(config)?);

        Ok(Self { state })
    }
}

fn tool_schema<T: schemars::JsonSchema>() -> Arc<serde_json::Map<String, serde_json::Value>> {
    match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(serde_json::Value::Object(map)) => Arc::new(map),
        _ => Arc::new(serde_json::Map::new()),
    }
}

/// Serialize a canonical record into MCP text content.
fn record_content<T: serde::Serialize>(payload: &T) -> Vec<Content> {
    let text = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
    vec![Content::text(text)]
}

fn error_content(err: &ServiceError) -> Vec<Content> {
    let text = serde_json::to_string(&ErrorResponse {
        kind: err.kind().to_string(),
        error: err.to_string(),
    })
    .unwrap_or_else(|_| "{}".to_string());
    vec![Content::text(text)]
}

impl rmcp::ServerHandler for McpService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            server_info: Implementation {
                name: "cdc-intranet-mcp".to_string(),
                version: "0.1.0".to_string(),
            },
            instructions: Some(
                "Search capabilities for the CDC internal web (intranet). Use search_cdc_intranet to find relevant pages and sites, then fetch_cdc_intranet to retrieve the full content of a result.".to_string(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _page: Option<PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let tools = vec![
            Tool {
                name: Cow::Borrowed("search_cdc_intranet"),
                description: Some(Cow::Borrowed("Search engine for sites on the CDC internal web (intranet). Returns a list of search results with titles, text snippets and URLs from CDC internal websites.")),
                input_schema: tool_schema::<SearchToolParams>(),
                output_schema: None,
                annotations: None,
            },
            Tool {
                name: Cow::Borrowed("fetch_cdc_intranet"),
                description: Some(Cow::Borrowed("Fetch the full contents of a CDC intranet page by its unique identifier or URL, obtained from search_cdc_intranet. Returns the extracted title and plain text of the page.")),
                input_schema: tool_schema::<FetchToolParams>(),
                output_schema: None,
                annotations: None,
            },
        ];

        Ok(ListToolsResult {
            tools,
            ..Default::default()
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        info!("MCP tool call: {} with args: {:?}", request.name, request.arguments);

        let args = request.arguments.ok_or_else(|| {
            ErrorData::new(
                ErrorCode::INVALID_PARAMS,
                "Missing required arguments object",
                None,
            )
        })?;

        match request.name.as_ref() {
            "search_cdc_intranet" => {
                let params: SearchToolParams =
                    serde_json::from_value(serde_json::Value::Object(args)).map_err(|e| {
                        ErrorData::new(
                            ErrorCode::INVALID_PARAMS,
                            format!("Invalid arguments: {e}"),
                            None,
                        )
                    })?;

                match search::search_intranet(&self.state, &params.query).await {
                    Ok(results) => Ok(CallToolResult::success(record_content(&SearchResponse {
                        results,
                    }))),
                    Err(e) => {
                        error!("Search tool error: {}", e);
                        Ok(CallToolResult::error(error_content(&e)))
                    }
                }
            }
            "fetch_cdc_intranet" => {
                let params: FetchToolParams =
                    serde_json::from_value(serde_json::Value::Object(args)).map_err(|e| {
                        ErrorData::new(
                            ErrorCode::INVALID_PARAMS,
                            format!("Invalid arguments: {e}"),
                            None,
                        )
                    })?;

                match fetch::fetch_page(&self.state, &params.id).await {
                    Ok(page) => Ok(CallToolResult::success(record_content(&page))),
                    Err(e) => {
                        error!("Fetch tool error: {}", e);
                        Ok(CallToolResult::error(error_content(&e)))
                    }
                }
            }
            _ => Err(ErrorData::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("Unknown tool: {}", request.name),
                None,
            )),
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let service = McpService::new()?;
    // Use the stdio transport from rmcp
    let server = service.serve(rmcp::transport::stdio()).await?;
    info!("MCP stdio server running");
    let _quit_reason = server.waiting().await?;
    Ok(())
}
