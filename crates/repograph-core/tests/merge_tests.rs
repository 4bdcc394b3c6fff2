use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use repograph_core::attribution::DeveloperRecord;
use repograph_core::extract::{FileExtraction, FunctionRecord, ImportRecord, ModuleRecord};
use repograph_core::graph::{GraphError, GraphStore, Record, Statement};
use repograph_core::merge::{ExtractionSet, GraphMerger};

/// Store fake that records every statement and can fail the first N runs.
#[derive(Default)]
struct FakeStore {
    statements: Mutex<Vec<Statement>>,
    failures: Mutex<Vec<GraphError>>,
}

impl FakeStore {
    fn failing_once_with(error: GraphError) -> Self {
        Self {
            statements: Mutex::new(Vec::new()),
            failures: Mutex::new(vec![error]),
        }
    }

    fn seen(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphStore for FakeStore {
    async fn run(&self, statement: Statement) -> Result<(), GraphError> {
        self.statements.lock().unwrap().push(statement);
        if let Some(error) = self.failures.lock().unwrap().pop() {
            return Err(error);
        }
        Ok(())
    }

    async fn fetch(&self, statement: Statement) -> Result<Vec<Record>, GraphError> {
        self.statements.lock().unwrap().push(statement);
        Ok(Vec::new())
    }
}

fn function(name: &str, line: i64, calls: &[&str]) -> FunctionRecord {
    FunctionRecord {
        id: format!("{}:{}", name, line),
        name: name.to_string(),
        parameters: vec!["u".to_string(), "p".to_string()],
        return_type: None,
        file_path: "src/auth.py".to_string(),
        line,
        calls: calls.iter().map(|c| c.to_string()).collect(),
    }
}

fn auth_extraction_set() -> ExtractionSet {
    let mut set = ExtractionSet {
        files: vec![FileExtraction {
            module: ModuleRecord {
                file_path: "src/auth.py".to_string(),
                language: "python".to_string(),
            },
            functions: vec![function("login", 1, &["check"]), function("check", 4, &[])],
            imports: vec![ImportRecord {
                name: "hashlib".to_string(),
                level: None,
            }],
        }],
        ..Default::default()
    };
    set.developers_by_file.insert(
        "src/auth.py".to_string(),
        vec![DeveloperRecord {
            name: Some("Alice".to_string()),
            email: Some("alice@example.com".to_string()),
            team: None,
        }],
    );
    set
}

mod ordering {
    use super::*;

    #[tokio::test]
    async fn test_all_node_merges_precede_relationship_merges() {
        let store = Arc::new(FakeStore::default());
        let merger = GraphMerger::new(store.clone());

        merger.merge(&auth_extraction_set()).await.unwrap();

        let seen = store.seen();
        // Node merges start with MERGE, relationship merges locate
        // endpoints first and start with MATCH
        let first_relationship = seen
            .iter()
            .position(|s| s.text.starts_with("MATCH"))
            .unwrap();
        assert!(seen[..first_relationship]
            .iter()
            .all(|s| s.text.starts_with("MERGE")));
        assert!(seen[first_relationship..]
            .iter()
            .all(|s| s.text.starts_with("MATCH")));
    }
}

mod stats {
    use super::*;

    #[tokio::test]
    async fn test_counts_for_one_file() {
        let store = Arc::new(FakeStore::default());
        let merger = GraphMerger::new(store);

        let stats = merger.merge(&auth_extraction_set()).await.unwrap();

        assert_eq!(stats.modules, 1);
        assert_eq!(stats.functions, 2);
        assert_eq!(stats.libraries, 1);
        assert_eq!(stats.developers, 1);
        // CONTAINS x2, CALLS x1, USES x1, WROTE x1
        assert_eq!(stats.relationships, 5);
        assert_eq!(stats.calls_dropped, 0);
    }

    #[tokio::test]
    async fn test_call_without_same_file_definition_is_dropped() {
        let store = Arc::new(FakeStore::default());
        let merger = GraphMerger::new(store.clone());

        let set = ExtractionSet {
            files: vec![FileExtraction {
                module: ModuleRecord {
                    file_path: "src/auth.py".to_string(),
                    language: "python".to_string(),
                },
                functions: vec![function("login", 1, &["requests_get"])],
                imports: Vec::new(),
            }],
            ..Default::default()
        };

        let stats = merger.merge(&set).await.unwrap();

        assert_eq!(stats.calls_dropped, 1);
        assert!(store
            .seen()
            .iter()
            .all(|s| !s.text.contains("[:CALLS]")));
    }
}

mod semantics {
    use super::*;

    #[tokio::test]
    async fn test_node_statements_are_upserts_with_coalesce_updates() {
        let store = Arc::new(FakeStore::default());
        let merger = GraphMerger::new(store.clone());

        merger.merge(&auth_extraction_set()).await.unwrap();

        let seen = store.seen();
        let module = seen
            .iter()
            .find(|s| s.text.contains("m:Module"))
            .unwrap();
        assert!(module.text.starts_with("MERGE"));
        assert!(module.text.contains("coalesce(m.language"));

        let function = seen
            .iter()
            .find(|s| s.text.starts_with("MERGE (f:Function"))
            .unwrap();
        assert!(function.text.contains("coalesce(f.return_type"));
        assert_eq!(function.params["parameters"], json!(["u", "p"]));
    }

    #[tokio::test]
    async fn test_calls_edge_matches_callee_by_name_and_file_path() {
        let store = Arc::new(FakeStore::default());
        let merger = GraphMerger::new(store.clone());

        merger.merge(&auth_extraction_set()).await.unwrap();

        let seen = store.seen();
        let calls = seen
            .iter()
            .find(|s| s.text.contains("[:CALLS]"))
            .unwrap();
        assert_eq!(calls.params["caller_id"], json!("login:1"));
        assert_eq!(calls.params["callee"], json!("check"));
        assert_eq!(calls.params["file_path"], json!("src/auth.py"));
    }

    #[tokio::test]
    async fn test_developer_key_falls_back_for_missing_email() {
        let store = Arc::new(FakeStore::default());
        let merger = GraphMerger::new(store.clone());

        let mut set = auth_extraction_set();
        set.developers_by_file.insert(
            "src/auth.py".to_string(),
            vec![DeveloperRecord {
                name: Some("Bob".to_string()),
                email: None,
                team: None,
            }],
        );

        merger.merge(&set).await.unwrap();

        let seen = store.seen();
        let developer = seen
            .iter()
            .find(|s| s.text.contains("d:Developer"))
            .unwrap();
        assert_eq!(developer.params["email"], json!("Bob"));
    }
}

mod retries {
    use super::*;

    #[tokio::test]
    async fn test_constraint_conflict_is_retried() {
        let store = Arc::new(FakeStore::failing_once_with(GraphError::Query(
            "Node(42) already exists with label `Module`".to_string(),
        )));
        let merger = GraphMerger::new(store.clone());

        let result = merger.merge(&auth_extraction_set()).await;
        assert!(result.is_ok());

        // First statement was attempted twice
        let seen = store.seen();
        assert_eq!(seen[0].text, seen[1].text);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let store = Arc::new(FakeStore::failing_once_with(GraphError::Query(
            "connection reset".to_string(),
        )));
        let merger = GraphMerger::new(store.clone());

        let result = merger.merge(&auth_extraction_set()).await;
        assert!(result.is_err());
        assert_eq!(store.seen().len(), 1);
    }
}
