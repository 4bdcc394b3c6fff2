//! Source entity extraction.
//!
//! One pass over a file's syntax tree produces a module record, its
//! function records (each carrying a caller-scoped call set), and the
//! root names of its library imports. Extraction is a pure function of
//! the file contents; nothing is resolved against the graph here.

mod python;

pub use python::PythonExtractor;

use thiserror::Error;

/// Errors from extracting entities out of one file.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file's syntax could not be parsed; the caller skips the file.
    #[error("Syntax error in {path}")]
    Parse { path: String },

    /// The grammar could not be loaded into the parser.
    #[error("Parser initialization failed: {0}")]
    Language(String),
}

/// One source file's metadata record.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRecord {
    pub file_path: String,
    pub language: String,
}

/// One function definition's metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionRecord {
    /// Unique key, `name:line`. Stable across re-runs on an unchanged
    /// file and distinct for two same-named functions at different lines.
    pub id: String,
    pub name: String,
    /// Parameter names in declaration order.
    pub parameters: Vec<String>,
    pub return_type: Option<String>,
    pub file_path: String,
    /// 1-based line of the definition.
    pub line: i64,
    /// Simple names of callees referenced inside the body, deduplicated.
    /// Resolution to actual Function nodes happens at merge time, by
    /// name within the same file only.
    pub calls: Vec<String>,
}

/// One import's root package name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ImportRecord {
    /// Text before the first `.` of the imported path.
    pub name: String,
    /// Relative-import level, carried but otherwise unused.
    pub level: Option<u32>,
}

/// Everything extracted from one file.
#[derive(Debug, Clone)]
pub struct FileExtraction {
    pub module: ModuleRecord,
    pub functions: Vec<FunctionRecord>,
    pub imports: Vec<ImportRecord>,
}
