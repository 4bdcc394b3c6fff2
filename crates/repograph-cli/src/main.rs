mod serve;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use repograph_core::config::DEFAULT_AGENT_SYSTEM_PROMPT;
use repograph_core::gateway::RemoteGateway;
use repograph_core::{
    AgentOrchestrator, Config, GeminiClient, GraphMerger, Ingestor, Neo4jGraph,
};

#[derive(Parser)]
#[command(name = "repograph")]
#[command(about = "Build and query a knowledge graph of a codebase", long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a source tree into the graph
    Ingest {
        /// Path to the source code root
        #[arg(long)]
        root: PathBuf,

        /// Use git blame to infer authorship
        #[arg(long)]
        include_authors: bool,
    },
    /// Ask a natural-language question through a serving gateway
    Ask {
        /// The question to answer
        question: String,

        /// Address of the query gateway endpoint
        #[arg(long, default_value = "http://localhost:8000")]
        server: String,
    },
    /// Serve the query gateway and the agent over HTTP
    Serve {
        /// Bind host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Ingest {
            root,
            include_authors,
        } => {
            let store = Arc::new(Neo4jGraph::connect(&config.graph).await?);
            store.ensure_constraints().await?;

            let ingestor = Ingestor::new(GraphMerger::new(store), include_authors);
            let stats = ingestor.run(&root).await?;

            println!("Ingestion complete:");
            println!("  Files parsed:  {}", stats.files_parsed);
            println!("  Files skipped: {}", stats.files_skipped);
            println!(
                "  Nodes merged:  {} modules, {} functions, {} libraries, {} developers",
                stats.merge.modules,
                stats.merge.functions,
                stats.merge.libraries,
                stats.merge.developers,
            );
            println!(
                "  Relationships: {} ({} calls dropped)",
                stats.merge.relationships, stats.merge.calls_dropped,
            );
        }
        Commands::Ask { question, server } => {
            let model = Arc::new(GeminiClient::from_config(&config.llm)?);
            let gateway = Arc::new(RemoteGateway::new(server));
            let agent = AgentOrchestrator::new(
                model,
                gateway,
                DEFAULT_AGENT_SYSTEM_PROMPT,
                config.agent.max_rounds,
            );

            let answer = agent.answer(&question).await?;
            println!("{}", answer);
        }
        Commands::Serve { host, port } => {
            let mut config = config;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve::start_server(config).await?;
        }
    }

    Ok(())
}
