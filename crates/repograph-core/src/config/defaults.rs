//! Default values for Repograph configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Graph Store Defaults
// ============================================================================

/// Default Bolt URI for the graph store.
pub const DEFAULT_GRAPH_URI: &str = "bolt://localhost:7687";

/// Default graph store username.
pub const DEFAULT_GRAPH_USERNAME: &str = "neo4j";

/// Default graph store database name.
pub const DEFAULT_GRAPH_DATABASE: &str = "neo4j";

// ============================================================================
// Gateway Defaults
// ============================================================================

/// Whether the query gateway rejects write queries by default.
pub const DEFAULT_READ_ONLY: bool = true;

// ============================================================================
// Server Defaults
// ============================================================================

/// Default bind host for the HTTP surface.
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default bind port for the HTTP surface.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

// ============================================================================
// LLM Defaults
// ============================================================================

/// Default Gemini API base URL.
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

// ============================================================================
// Agent Defaults
// ============================================================================

/// Maximum number of tool-call rounds per question.
pub const DEFAULT_MAX_ROUNDS: usize = 8;

/// System instruction for the graph assistant.
///
/// The schema section is a contract: the model must use exactly these
/// labels and property names, never invented ones.
pub const DEFAULT_AGENT_SYSTEM_PROMPT: &str = "\
You are an expert assistant answering questions about a software project's codebase. \
Your only tool is execute_cypher_query, which runs a Cypher query against a Neo4j \
knowledge graph and returns the rows. Analyze the user's question, build the \
appropriate Cypher query, and call the tool to get the data you need. \
Schema (labels and property names are EXACTLY these): \
Nodes: Developer(name,email,team), Module(file_path,language), \
Function(id,name,parameters,return_type,line,file_path), Library(name,version). \
Relationships: WROTE(Developer->Module), CONTAINS(Module->Function), \
CALLS(Function->Function), USES(Module->Library). \
IMPORTANT: there is NO 'file_name' property, always use 'file_path'. When the user \
gives a bare file name, do not match with equality; match with ENDS WITH. \
Examples: \
1) A specific file: MATCH (m:Module) WHERE m.file_path ENDS WITH 'auth.py' \
MATCH (d:Developer)-[:WROTE]->(m) RETURN d.name, d.email. \
2) Module count: MATCH (m:Module) RETURN count(m) AS module_count. \
3) Libraries: MATCH (m:Module)-[:USES]->(l:Library) RETURN l.name, count(*) AS used_by. \
Return only the fields you need, and keep the final answer short. \
Base the answer only on the returned rows, never on guesses.";
