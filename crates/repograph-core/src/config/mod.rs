//! Configuration management for Repograph.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `repograph.toml` file
//! 3. User config `~/.config/repograph/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Graph store connection configuration.
    pub graph: GraphConfig,

    /// Query gateway configuration.
    pub gateway: GatewayConfig,

    /// LLM provider configuration.
    pub llm: LlmConfig,

    /// HTTP server configuration.
    pub server: ServerConfig,

    /// Agent loop configuration.
    pub agent: AgentConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            graph: GraphConfig::default(),
            gateway: GatewayConfig::default(),
            llm: LlmConfig::default(),
            server: ServerConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./repograph.toml` (project local)
    /// 2. `~/.config/repograph/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        // Try project-local config first
        if Path::new("repograph.toml").exists() {
            return Self::from_file("repograph.toml");
        }

        // Try user config
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("repograph").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // Use defaults (env vars still apply)
        let mut config = Config::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // Graph store overrides
        if let Ok(uri) = std::env::var("NEO4J_URI") {
            self.graph.uri = uri;
        }
        if let Ok(username) = std::env::var("NEO4J_USERNAME") {
            self.graph.username = username;
        }
        if let Ok(password) = std::env::var("NEO4J_PASSWORD") {
            self.graph.password = password;
        }
        if let Ok(database) = std::env::var("NEO4J_DATABASE") {
            self.graph.database = database;
        }

        // Gateway overrides
        if let Ok(flag) = std::env::var("REPOGRAPH_READ_ONLY") {
            self.gateway.read_only = parse_truthy(&flag);
        }

        // LLM overrides
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            self.llm.api_key = Some(key);
        }

        // Server overrides
        if let Ok(host) = std::env::var("REPOGRAPH_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("REPOGRAPH_PORT") {
            if let Ok(n) = port.parse() {
                self.server.port = n;
            }
        }
    }
}

/// Parse a truthy environment value: `1`, `true`, `yes`, `on` (case-insensitive).
pub fn parse_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Graph store connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Bolt URI of the graph store.
    pub uri: String,

    /// Username for authentication.
    pub username: String,

    /// Password for authentication.
    #[serde(skip_serializing)]
    pub password: String,

    /// Database name.
    pub database: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_GRAPH_URI.to_string(),
            username: DEFAULT_GRAPH_USERNAME.to_string(),
            password: String::new(),
            database: DEFAULT_GRAPH_DATABASE.to_string(),
        }
    }
}

/// Query gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Reject write queries before they reach the store.
    pub read_only: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            read_only: DEFAULT_READ_ONLY,
        }
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key (can also be set via GEMINI_API_KEY).
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Model name.
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None, // Load from env
            model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,

    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_SERVER_PORT,
        }
    }
}

/// Agent loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum number of tool-call rounds per question.
    pub max_rounds: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}
