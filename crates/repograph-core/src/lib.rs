pub mod agent;
pub mod attribution;
pub mod config;
pub mod extract;
pub mod gateway;
pub mod graph;
pub mod ingest;
pub mod llm;
pub mod merge;

pub use agent::{AgentError, AgentOrchestrator};
pub use config::Config;
pub use extract::PythonExtractor;
pub use gateway::{GatewayError, QueryGateway};
pub use graph::{GraphError, GraphStore, Neo4jGraph, Record, Statement};
pub use ingest::{IngestStats, Ingestor};
pub use llm::{GeminiClient, LlmError, ToolModel};
pub use merge::{ExtractionSet, GraphMerger, MergeStats};
