//! HTTP route handlers.
//!
//! Handlers are kept thin: status mapping here, everything else in the
//! core crate. Validation failures map to 400 with the gateway's
//! message; other execution failures map to 500 with a generic message
//! so store internals never leak; agent failures map to 502.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use repograph_core::gateway::{GatewayError, QueryExecutor};

use super::models::{AskRequest, AskResponse, CypherRequest, CypherResponse, ErrorBody};
use super::AppState;

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

/// GET `/health`.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// POST `/execute_cypher_query`.
pub async fn execute_cypher_query(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CypherRequest>,
) -> Result<Json<CypherResponse>, ApiError> {
    match state.gateway.execute(&body.query, body.params).await {
        Ok(results) => Ok(Json(CypherResponse { results })),
        Err(e @ GatewayError::Validation(_)) => {
            Err(api_error(StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(e) => {
            tracing::error!("Query execution failed: {}", e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Execution error",
            ))
        }
    }
}

/// POST `/ask`.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let Some(agent) = &state.agent else {
        return Err(api_error(
            StatusCode::BAD_GATEWAY,
            "Agent is not configured (missing API key)",
        ));
    };

    match agent.answer(&body.question).await {
        Ok(answer) => Ok(Json(AskResponse { answer })),
        Err(e) => {
            tracing::error!("Agent failed: {}", e);
            Err(api_error(StatusCode::BAD_GATEWAY, "Agent error"))
        }
    }
}
