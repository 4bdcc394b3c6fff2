//! HTTP surface for the query gateway and the agent.
//!
//! # Module Structure
//!
//! - `handlers` - HTTP route handlers
//! - `models` - API request/response types (DTOs)

mod handlers;
mod models;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use repograph_core::config::DEFAULT_AGENT_SYSTEM_PROMPT;
use repograph_core::{AgentOrchestrator, Config, GeminiClient, Neo4jGraph, QueryGateway};

/// Shared application state for the server.
pub struct AppState {
    /// The query gateway, in its configured mode.
    pub gateway: Arc<QueryGateway>,
    /// The agent, if an API key is configured.
    pub agent: Option<AgentOrchestrator>,
}

/// Start the server and block until shutdown.
pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(Neo4jGraph::connect(&config.graph).await?);
    let gateway = Arc::new(QueryGateway::new(store, config.gateway.read_only));

    // The agent answers through the same gateway, in the gateway's mode
    let agent = match GeminiClient::from_config(&config.llm) {
        Ok(model) => Some(AgentOrchestrator::new(
            Arc::new(model),
            gateway.clone(),
            DEFAULT_AGENT_SYSTEM_PROMPT,
            config.agent.max_rounds,
        )),
        Err(e) => {
            tracing::warn!("Agent disabled: {}", e);
            None
        }
    };

    let state = Arc::new(AppState { gateway, agent });

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/execute_cypher_query", post(handlers::execute_cypher_query))
        .route("/ask", post(handlers::ask))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutting down");
}
