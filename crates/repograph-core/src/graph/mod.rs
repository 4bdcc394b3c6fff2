//! Graph store abstraction and the Bolt-backed client.
//!
//! All components talk to the store through the [`GraphStore`] trait so
//! tests can inject fakes; [`Neo4jGraph`] is the production implementation.

mod client;
mod error;

pub use client::Neo4jGraph;
pub use error::GraphError;

use async_trait::async_trait;
use serde_json::Value;

/// One result row: an ordered mapping from column name to value.
///
/// `serde_json` is built with `preserve_order`, so the map keeps the
/// column order the store returned.
pub type Record = serde_json::Map<String, Value>;

/// A Cypher statement with named parameters.
#[derive(Debug, Clone)]
pub struct Statement {
    pub text: String,
    pub params: serde_json::Map<String, Value>,
}

impl Statement {
    /// Create a statement with no parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: serde_json::Map::new(),
        }
    }

    /// Add a named parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a map of named parameters.
    pub fn params(mut self, params: serde_json::Map<String, Value>) -> Self {
        self.params.extend(params);
        self
    }
}

/// Connection to the persistent graph store.
///
/// One statement is one transaction: either the full result set comes
/// back or the call fails, never partial rows.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Execute a statement, discarding any result rows.
    async fn run(&self, statement: Statement) -> Result<(), GraphError>;

    /// Execute a statement and collect the full result set.
    async fn fetch(&self, statement: Statement) -> Result<Vec<Record>, GraphError>;
}
