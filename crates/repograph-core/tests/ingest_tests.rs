use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use repograph_core::graph::{GraphError, GraphStore, Record, Statement};
use repograph_core::ingest::{IngestError, Ingestor};
use repograph_core::merge::GraphMerger;

/// Store fake that records every statement it is handed.
#[derive(Default)]
struct FakeStore {
    statements: Mutex<Vec<Statement>>,
}

impl FakeStore {
    fn seen(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphStore for FakeStore {
    async fn run(&self, statement: Statement) -> Result<(), GraphError> {
        self.statements.lock().unwrap().push(statement);
        Ok(())
    }

    async fn fetch(&self, statement: Statement) -> Result<Vec<Record>, GraphError> {
        self.statements.lock().unwrap().push(statement);
        Ok(Vec::new())
    }
}

fn ingestor(store: Arc<FakeStore>) -> Ingestor {
    Ingestor::new(GraphMerger::new(store), false)
}

mod walking {
    use super::*;

    #[tokio::test]
    async fn test_malformed_and_non_python_files_do_not_stop_the_pass() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("auth.py"),
            "def login(u, p):\n    return check(u, p)\n\ndef check(u, p):\n    return True\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.py"), "def broken(:\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not source code\n").unwrap();

        let store = Arc::new(FakeStore::default());
        let stats = ingestor(store.clone()).run(dir.path()).await.unwrap();

        // notes.txt is never considered, broken.py is a counted skip
        assert_eq!(stats.files_parsed, 1);
        assert_eq!(stats.files_skipped, 1);
        assert_eq!(stats.merge.modules, 1);
        assert_eq!(stats.merge.functions, 2);
        assert!(!store.seen().is_empty());
    }

    #[tokio::test]
    async fn test_subdirectories_are_walked() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("main.py"), "def main():\n    pass\n").unwrap();
        std::fs::write(
            dir.path().join("pkg").join("util.py"),
            "def helper():\n    pass\n",
        )
        .unwrap();

        let store = Arc::new(FakeStore::default());
        let stats = ingestor(store).run(dir.path()).await.unwrap();

        assert_eq!(stats.files_parsed, 2);
        assert_eq!(stats.files_skipped, 0);
        assert_eq!(stats.merge.modules, 2);
    }

    #[tokio::test]
    async fn test_empty_tree_merges_nothing() {
        let dir = tempfile::tempdir().unwrap();

        let store = Arc::new(FakeStore::default());
        let stats = ingestor(store.clone()).run(dir.path()).await.unwrap();

        assert_eq!(stats.files_parsed, 0);
        assert_eq!(stats.merge.relationships, 0);
        assert!(store.seen().is_empty());
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FakeStore::default());

        let result = ingestor(store).run(&dir.path().join("nope")).await;
        assert!(matches!(result, Err(IngestError::InvalidRoot(_))));
    }
}
