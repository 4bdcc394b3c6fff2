//! One ingestion pass: walk a source tree, extract, attribute, merge.
//!
//! File-level failures (unreadable or unparseable files) are absorbed
//! with a counted skip so the pass makes best-effort progress over the
//! whole tree; only merge failures abort.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use thiserror::Error;

use crate::attribution::resolve_authors;
use crate::extract::PythonExtractor;
use crate::graph::GraphError;
use crate::merge::{ExtractionSet, GraphMerger, MergeStats};

/// Errors fatal to an ingestion pass.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Root path {0} is not a directory")]
    InvalidRoot(PathBuf),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Outcome of one ingestion pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct IngestStats {
    pub files_parsed: usize,
    /// Files that could not be read or parsed. Tracked so ingestion
    /// failures stay observable rather than silently swallowed.
    pub files_skipped: usize,
    pub merge: MergeStats,
}

/// Walks a root directory and feeds the merger.
pub struct Ingestor {
    extractor: PythonExtractor,
    merger: GraphMerger,
    include_authors: bool,
}

impl Ingestor {
    pub fn new(merger: GraphMerger, include_authors: bool) -> Self {
        Self {
            extractor: PythonExtractor::new(),
            merger,
            include_authors,
        }
    }

    /// Run one full pass over the tree rooted at `root`.
    pub async fn run(&self, root: &Path) -> Result<IngestStats, IngestError> {
        if !root.is_dir() {
            return Err(IngestError::InvalidRoot(root.to_path_buf()));
        }

        let mut stats = IngestStats::default();
        let mut set = ExtractionSet::default();

        // Hidden files and gitignored paths are skipped by the walker.
        for entry in WalkBuilder::new(root).build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Walk error: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("py") {
                continue;
            }

            let source = match std::fs::read_to_string(path) {
                Ok(source) => source,
                Err(e) => {
                    tracing::warn!("Skipping unreadable file {}: {}", path.display(), e);
                    stats.files_skipped += 1;
                    continue;
                }
            };

            let file_path = path.to_string_lossy().to_string();
            let extraction = match self.extractor.extract_file(&file_path, &source) {
                Ok(extraction) => extraction,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                    stats.files_skipped += 1;
                    continue;
                }
            };

            stats.files_parsed += 1;

            if self.include_authors {
                let developers = resolve_authors(path).await;
                if !developers.is_empty() {
                    set.developers_by_file.insert(file_path.clone(), developers);
                }
            }

            set.files.push(extraction);
        }

        stats.merge = self.merger.merge(&set).await?;

        tracing::info!(
            "Ingested {} files ({} skipped): {} modules, {} functions, {} relationships",
            stats.files_parsed,
            stats.files_skipped,
            stats.merge.modules,
            stats.merge.functions,
            stats.merge.relationships,
        );

        Ok(stats)
    }
}
