//! Bolt-protocol client for the persistent graph store.

use async_trait::async_trait;
use neo4rs::{
    query, BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNull, BoltString, BoltType,
    ConfigBuilder, Graph,
};
use serde_json::Value;

use super::{GraphError, GraphStore, Record, Statement};
use crate::config::GraphConfig;

/// Uniqueness constraints required before ingestion.
///
/// `IF NOT EXISTS` makes the bootstrap idempotent; on store versions
/// without that syntax the individual statement fails and is logged.
const CONSTRAINTS: &[&str] = &[
    "CREATE CONSTRAINT module_file_path_unique IF NOT EXISTS FOR (m:Module) REQUIRE m.file_path IS UNIQUE",
    "CREATE CONSTRAINT function_id_unique IF NOT EXISTS FOR (f:Function) REQUIRE f.id IS UNIQUE",
    "CREATE CONSTRAINT developer_email_unique IF NOT EXISTS FOR (d:Developer) REQUIRE d.email IS UNIQUE",
    "CREATE CONSTRAINT library_name_unique IF NOT EXISTS FOR (l:Library) REQUIRE l.name IS UNIQUE",
];

/// Production [`GraphStore`] backed by a Bolt connection pool.
pub struct Neo4jGraph {
    graph: Graph,
}

impl Neo4jGraph {
    /// Connect to the store described by the configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let bolt_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.username)
            .password(&config.password)
            .db(config.database.as_str())
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(bolt_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        Ok(Self { graph })
    }

    /// Create the uniqueness constraints the ingestion pass relies on.
    ///
    /// Individual failures are logged and skipped so startup still works
    /// against stores where the constraints already exist in an older form.
    pub async fn ensure_constraints(&self) -> Result<(), GraphError> {
        for constraint in CONSTRAINTS {
            if let Err(e) = self.graph.run(query(constraint)).await {
                tracing::warn!("Constraint setup skipped: {}", e);
            }
        }
        Ok(())
    }

    fn build_query(statement: Statement) -> neo4rs::Query {
        let mut q = query(&statement.text);
        for (key, value) in &statement.params {
            q = q.param(key, json_to_bolt(value));
        }
        q
    }
}

#[async_trait]
impl GraphStore for Neo4jGraph {
    async fn run(&self, statement: Statement) -> Result<(), GraphError> {
        self.graph.run(Self::build_query(statement)).await?;
        Ok(())
    }

    async fn fetch(&self, statement: Statement) -> Result<Vec<Record>, GraphError> {
        let mut stream = self.graph.execute(Self::build_query(statement)).await?;

        let mut records = Vec::new();
        while let Some(row) = stream.next().await? {
            let record: Record = row.to().map_err(|e| GraphError::Decode(e.to_string()))?;
            records.push(record);
        }
        Ok(records)
    }
}

/// Convert a JSON parameter value to its Bolt representation.
fn json_to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::Boolean(BoltBoolean::new(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                BoltType::Integer(BoltInteger::new(i))
            } else {
                BoltType::Float(BoltFloat::new(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        Value::String(s) => BoltType::String(BoltString::from(s.as_str())),
        Value::Array(items) => {
            let list: Vec<BoltType> = items.iter().map(json_to_bolt).collect();
            BoltType::List(BoltList::from(list))
        }
        Value::Object(map) => {
            let mut bolt_map = BoltMap::default();
            for (key, item) in map {
                bolt_map.put(BoltString::from(key.as_str()), json_to_bolt(item));
            }
            BoltType::Map(bolt_map)
        }
    }
}
