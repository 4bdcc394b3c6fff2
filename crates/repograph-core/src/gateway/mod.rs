//! Safety-gated Cypher execution.
//!
//! [`QueryGateway`] runs structured queries against the graph store and,
//! when configured read-only, refuses write-shaped queries before they
//! reach the store. [`RemoteGateway`] is the same contract over HTTP,
//! for callers that talk to a serving gateway instead of the store.

mod remote;

pub use remote::RemoteGateway;

use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;

use crate::graph::{GraphError, GraphStore, Record, Statement};

/// Tokens that indicate a query can mutate the store.
///
/// Matched case-insensitively on word boundaries, so property names like
/// `created_at` do not trip the guard.
const WRITE_TOKEN_PATTERN: &str =
    r"(?i)\b(CREATE|MERGE|DELETE|SET|DROP|LOAD\s+CSV|CALL\s+dbms|CALL\s+db\.)\b";

/// Errors from query execution.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The query was refused before reaching the store.
    #[error("{0}")]
    Validation(String),

    /// The store failed the query.
    #[error(transparent)]
    Store(#[from] GraphError),

    /// A remote gateway could not be reached or answered malformed.
    #[error("Gateway transport error: {0}")]
    Transport(String),
}

/// Anything that can execute a Cypher query and return ordered records.
///
/// Implemented by [`QueryGateway`] (direct store access) and
/// [`RemoteGateway`] (HTTP); the agent loop only sees this trait.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(
        &self,
        query: &str,
        params: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<Vec<Record>, GatewayError>;
}

/// Executes structured queries against the graph store, enforcing the
/// read-only guard when configured.
pub struct QueryGateway {
    store: Arc<dyn GraphStore>,
    read_only: bool,
    write_tokens: Regex,
}

impl QueryGateway {
    pub fn new(store: Arc<dyn GraphStore>, read_only: bool) -> Self {
        Self {
            store,
            read_only,
            write_tokens: Regex::new(WRITE_TOKEN_PATTERN).expect("write-token pattern is valid"),
        }
    }

    /// Whether the gateway refuses write-shaped queries.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Validate a query against the read-only guard without executing it.
    pub fn validate(&self, query: &str) -> Result<(), GatewayError> {
        if self.read_only && self.write_tokens.is_match(query) {
            tracing::debug!("Refused write-shaped query in read-only mode");
            return Err(GatewayError::Validation(
                "Write operations are not allowed in read-only mode.".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl QueryExecutor for QueryGateway {
    async fn execute(
        &self,
        query: &str,
        params: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<Vec<Record>, GatewayError> {
        self.validate(query)?;

        let mut statement = Statement::new(query);
        if let Some(params) = params {
            statement = statement.params(params);
        }

        Ok(self.store.fetch(statement).await?)
    }
}
