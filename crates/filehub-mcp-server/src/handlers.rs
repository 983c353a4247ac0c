//! HTTP routes for the MCP server.
//!
//! Implements:
//! - GET /health - Health check endpoint
//! - /mcp - MCP Streamable HTTP endpoint (initialize, tools/list, tools/call)

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use filehub_search::FileHubMcp;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use serde::Serialize;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub mcp: FileHubMcp,
}

pub fn router(state: AppState) -> Router {
    let mcp = state.mcp.clone();
    let service = StreamableHttpService::new(
        move || Ok(mcp.clone()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig::default(),
    );

    Router::new()
        .route("/health", get(health_handler))
        .nest_service("/mcp", service)
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub storages_enabled: usize,
}

/// GET /health - Health check endpoint.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        storages_enabled: state.mcp.registry().adapters().len(),
    })
}
