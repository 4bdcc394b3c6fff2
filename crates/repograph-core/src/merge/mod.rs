//! Idempotent upsert of extracted entities into the graph.
//!
//! All node merges complete before any relationship merge runs, because
//! relationship statements locate both endpoints by unique key and no-op
//! if either is absent. Every statement is a `MERGE` with `coalesce`
//! updates, so re-merging an unchanged extraction is a zero-net-change
//! no-op and non-null attributes are never overwritten by null.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::attribution::DeveloperRecord;
use crate::extract::FileExtraction;
use crate::graph::{GraphError, GraphStore, Statement};

/// Bounded retries for uniqueness-constraint collisions between
/// concurrent workers.
const MAX_ATTEMPTS: usize = 3;

/// Everything gathered from one ingestion pass.
#[derive(Debug, Default)]
pub struct ExtractionSet {
    pub files: Vec<FileExtraction>,
    pub developers_by_file: BTreeMap<String, Vec<DeveloperRecord>>,
}

impl ExtractionSet {
    /// Distinct library names across all files.
    pub fn libraries(&self) -> BTreeSet<&str> {
        self.files
            .iter()
            .flat_map(|f| f.imports.iter().map(|i| i.name.as_str()))
            .collect()
    }
}

/// Counts of merge statements issued in one pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    pub modules: usize,
    pub functions: usize,
    pub libraries: usize,
    pub developers: usize,
    pub relationships: usize,
    /// Call sites whose callee has no same-file definition in this
    /// extraction; the corresponding merge is a no-op in the store.
    pub calls_dropped: usize,
}

/// Writes an [`ExtractionSet`] into the persistent graph.
pub struct GraphMerger {
    store: Arc<dyn GraphStore>,
}

impl GraphMerger {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Merge all nodes, then all relationships.
    pub async fn merge(&self, set: &ExtractionSet) -> Result<MergeStats, GraphError> {
        let mut stats = MergeStats::default();

        // Node phase
        for file in &set.files {
            self.merge_module(file, &mut stats).await?;
            for func in &file.functions {
                self.merge_function(file, func, &mut stats).await?;
            }
        }
        for library in set.libraries() {
            self.merge_library(library, &mut stats).await?;
        }
        for developers in set.developers_by_file.values() {
            for dev in developers {
                self.merge_developer(dev, &mut stats).await?;
            }
        }

        // Relationship phase
        let defined_names = local_function_names(set);
        for file in &set.files {
            for func in &file.functions {
                self.run_with_retry(
                    Statement::new(
                        "MATCH (m:Module {file_path: $file_path}), (f:Function {id: $id}) \
                         MERGE (m)-[:CONTAINS]->(f)",
                    )
                    .param("file_path", file.module.file_path.as_str())
                    .param("id", func.id.as_str()),
                )
                .await?;
                stats.relationships += 1;

                for callee in &func.calls {
                    let resolvable = defined_names
                        .get(file.module.file_path.as_str())
                        .map(|names| names.contains(callee.as_str()))
                        .unwrap_or(false);
                    if !resolvable {
                        stats.calls_dropped += 1;
                        continue;
                    }

                    self.run_with_retry(
                        Statement::new(
                            "MATCH (f1:Function {id: $caller_id}) \
                             MATCH (f2:Function {name: $callee, file_path: $file_path}) \
                             MERGE (f1)-[:CALLS]->(f2)",
                        )
                        .param("caller_id", func.id.as_str())
                        .param("callee", callee.as_str())
                        .param("file_path", file.module.file_path.as_str()),
                    )
                    .await?;
                    stats.relationships += 1;
                }
            }

            for import in &file.imports {
                self.run_with_retry(
                    Statement::new(
                        "MATCH (m:Module {file_path: $file_path}), (l:Library {name: $name}) \
                         MERGE (m)-[:USES]->(l)",
                    )
                    .param("file_path", file.module.file_path.as_str())
                    .param("name", import.name.as_str()),
                )
                .await?;
                stats.relationships += 1;
            }

            if let Some(developers) = set.developers_by_file.get(&file.module.file_path) {
                for dev in developers {
                    self.run_with_retry(
                        Statement::new(
                            "MATCH (d:Developer {email: $email}), (m:Module {file_path: $file_path}) \
                             MERGE (d)-[:WROTE]->(m)",
                        )
                        .param("email", dev.key())
                        .param("file_path", file.module.file_path.as_str()),
                    )
                    .await?;
                    stats.relationships += 1;
                }
            }
        }

        Ok(stats)
    }

    async fn merge_module(
        &self,
        file: &FileExtraction,
        stats: &mut MergeStats,
    ) -> Result<(), GraphError> {
        self.run_with_retry(
            Statement::new(
                "MERGE (m:Module {file_path: $file_path}) \
                 ON CREATE SET m.language = $language \
                 ON MATCH SET m.language = coalesce(m.language, $language)",
            )
            .param("file_path", file.module.file_path.as_str())
            .param("language", file.module.language.as_str()),
        )
        .await?;
        stats.modules += 1;
        Ok(())
    }

    async fn merge_function(
        &self,
        file: &FileExtraction,
        func: &crate::extract::FunctionRecord,
        stats: &mut MergeStats,
    ) -> Result<(), GraphError> {
        self.run_with_retry(
            Statement::new(
                "MERGE (f:Function {id: $id}) \
                 ON CREATE SET f.name = $name, f.parameters = $parameters, \
                     f.return_type = $return_type, f.file_path = $file_path, f.line = $line \
                 ON MATCH SET f.name = coalesce(f.name, $name), \
                     f.parameters = coalesce(f.parameters, $parameters), \
                     f.return_type = coalesce(f.return_type, $return_type), \
                     f.file_path = coalesce(f.file_path, $file_path), \
                     f.line = coalesce(f.line, $line)",
            )
            .param("id", func.id.as_str())
            .param("name", func.name.as_str())
            .param("parameters", json!(func.parameters))
            .param(
                "return_type",
                func.return_type
                    .as_deref()
                    .map(Value::from)
                    .unwrap_or(Value::Null),
            )
            .param("file_path", file.module.file_path.as_str())
            .param("line", func.line),
        )
        .await?;
        stats.functions += 1;
        Ok(())
    }

    async fn merge_library(&self, name: &str, stats: &mut MergeStats) -> Result<(), GraphError> {
        self.run_with_retry(
            Statement::new(
                "MERGE (l:Library {name: $name}) \
                 ON CREATE SET l.version = $version \
                 ON MATCH SET l.version = coalesce(l.version, $version)",
            )
            .param("name", name)
            // Versions are filled only if later known
            .param("version", Value::Null),
        )
        .await?;
        stats.libraries += 1;
        Ok(())
    }

    async fn merge_developer(
        &self,
        dev: &DeveloperRecord,
        stats: &mut MergeStats,
    ) -> Result<(), GraphError> {
        self.run_with_retry(
            Statement::new(
                "MERGE (d:Developer {email: $email}) \
                 ON CREATE SET d.name = $name, d.team = $team \
                 ON MATCH SET d.name = coalesce(d.name, $name), \
                     d.team = coalesce(d.team, $team)",
            )
            .param("email", dev.key())
            .param(
                "name",
                dev.name.as_deref().map(Value::from).unwrap_or(Value::Null),
            )
            .param(
                "team",
                dev.team.as_deref().map(Value::from).unwrap_or(Value::Null),
            ),
        )
        .await?;
        stats.developers += 1;
        Ok(())
    }

    /// Run one statement, retrying on constraint collisions. The retry
    /// lives here, not in the caller: collisions are expected when
    /// concurrent workers race on the same key.
    async fn run_with_retry(&self, statement: Statement) -> Result<(), GraphError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.store.run(statement.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_constraint_conflict() && attempt < MAX_ATTEMPTS => {
                    tracing::warn!("Constraint conflict on attempt {}, retrying: {}", attempt, e);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Function names defined per file, for same-file call resolution.
fn local_function_names(set: &ExtractionSet) -> HashMap<&str, HashSet<&str>> {
    let mut names: HashMap<&str, HashSet<&str>> = HashMap::new();
    for file in &set.files {
        let entry = names.entry(file.module.file_path.as_str()).or_default();
        for func in &file.functions {
            entry.insert(func.name.as_str());
        }
    }
    names
}
