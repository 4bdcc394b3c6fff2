use thiserror::Error;

/// Errors that can occur when talking to the graph store.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Connection to the store could not be established.
    #[error("Failed to connect to graph store: {0}")]
    Connection(String),

    /// The store rejected or failed a query.
    #[error("Query failed: {0}")]
    Query(String),

    /// A returned row could not be converted into a record.
    #[error("Failed to decode result row: {0}")]
    Decode(String),
}

impl GraphError {
    /// Whether this error looks like a uniqueness-constraint collision,
    /// which concurrent merges on the same key are expected to produce.
    ///
    /// The store reports these textually and the phrasing varies across
    /// releases, so we match on the stable fragments.
    pub fn is_constraint_conflict(&self) -> bool {
        let message = self.to_string();
        message.contains("ConstraintValidation") || message.contains("already exists")
    }
}

impl From<neo4rs::Error> for GraphError {
    fn from(err: neo4rs::Error) -> Self {
        GraphError::Query(err.to_string())
    }
}
