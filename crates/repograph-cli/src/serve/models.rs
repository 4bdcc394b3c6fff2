//! API request/response types (DTOs).

use repograph_core::Record;
use serde::{Deserialize, Serialize};

/// POST `/execute_cypher_query` request body.
#[derive(Debug, Deserialize)]
pub struct CypherRequest {
    pub query: String,
    #[serde(default)]
    pub params: Option<serde_json::Map<String, serde_json::Value>>,
}

/// POST `/execute_cypher_query` response body.
#[derive(Debug, Serialize)]
pub struct CypherResponse {
    pub results: Vec<Record>,
}

/// POST `/ask` request body.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// POST `/ask` response body.
#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
}

/// Error body for non-2xx responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
