use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use std::env;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use cdc_intranet_mcp::{config::Config, error::ServiceError, fetch, mcp, search, types::*, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting CDC Intranet MCP Server");

    // Bad or partial credentials must stop the process here, never surface
    // on a per-call basis.
    let config = Config::from_env()?;
    let state = Arc::new(AppState::new(config)?);

    // Build router
    let app = Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/search", post(search_handler))
        .route("/fetch", post(fetch_handler))
        .route("/mcp/tools", get(mcp::list_tools))
        .route("/mcp/call", post(mcp::call_tool))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let port = env::var("PORT").unwrap_or_else(|_| "8000".to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    info!("CDC Intranet MCP Server listening on http://0.0.0.0:{port}");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "cdc-intranet-mcp",
        "version": "0.1.0",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

fn error_reply(err: ServiceError) -> (StatusCode, Json<ErrorResponse>) {
    (
        err.http_status(),
        Json(ErrorResponse {
            kind: err.kind().to_string(),
            error: err.to_string(),
        }),
    )
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, (StatusCode, Json<ErrorResponse>)> {
    match search::search_intranet(&state, &request.query).await {
        Ok(results) => Ok(Json(SearchResponse { results })),
        Err(e) => {
            tracing::error!("Search error: {}", e);
            Err(error_reply(e))
        }
    }
}

async fn fetch_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FetchRequest>,
) -> Result<Json<PageContent>, (StatusCode, Json<ErrorResponse>)> {
    match fetch::fetch_page(&state, &request.id).await {
        Ok(page) => Ok(Json(page)),
        Err(e) => {
            tracing::error!("Fetch error: {}", e);
            Err(error_reply(e))
        }
    }
}
