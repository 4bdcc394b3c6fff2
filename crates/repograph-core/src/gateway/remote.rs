//! HTTP client for a serving query gateway.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{GatewayError, QueryExecutor};
use crate::graph::Record;

/// Talks to a gateway's `/execute_cypher_query` endpoint.
///
/// A `400` response carries the gateway's validation message and maps to
/// [`GatewayError::Validation`]; any other failure is a transport error.
pub struct RemoteGateway {
    base_url: String,
    client: Client,
}

impl RemoteGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            client: Client::new(),
        }
    }
}

#[derive(Serialize)]
struct CypherRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Deserialize)]
struct CypherResponse {
    results: Vec<Record>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

#[async_trait]
impl QueryExecutor for RemoteGateway {
    async fn execute(
        &self,
        query: &str,
        params: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<Vec<Record>, GatewayError> {
        let response = self
            .client
            .post(format!("{}/execute_cypher_query", self.base_url))
            .json(&CypherRequest { query, params })
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::BAD_REQUEST {
            let body = response.json::<ErrorBody>().await.ok();
            return Err(GatewayError::Validation(validation_message(body)));
        }

        if !status.is_success() {
            return Err(GatewayError::Transport(format!(
                "Gateway returned status {}",
                status.as_u16()
            )));
        }

        let body: CypherResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(body.results)
    }
}

/// The gateway's message from a 400 body, falling back to a generic one
/// when the body is missing, malformed, or carries an empty message.
fn validation_message(body: Option<ErrorBody>) -> String {
    match body {
        Some(ErrorBody { error }) if !error.is_empty() => error,
        _ => "Query validation failed".to_string(),
    }
}
