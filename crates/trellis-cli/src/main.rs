//! Trellis CLI - command line interface for the code knowledge graph

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{completions, graph, io, search};
use config::{default_config_path, Config};
use output::OutputFormat;
use trellis_mcp::McpServer;
use trellis_response::ResponseAssembler;
use trellis_store::{HashingEmbedder, KnowledgeGraphStore, RedbVectorStore};

/// The graph store every command works against
pub type GraphStore = KnowledgeGraphStore<RedbVectorStore, HashingEmbedder>;

#[derive(Parser)]
#[command(name = "trellis")]
#[command(author, version, about = "Code knowledge graph with token-bounded views for LLM agents")]
pub struct Cli {
    /// Data directory
    #[arg(short, long, env = "TRELLIS_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Config file
    #[arg(long = "config", env = "TRELLIS_CONFIG", global = true)]
    pub config_file: Option<PathBuf>,

    /// Output format for search and import
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config_file.clone().unwrap_or_else(default_config_path)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start MCP server on stdio
    Serve,
    /// Print a token-bounded view of the graph
    Graph(graph::GraphArgs),
    /// Search the knowledge graph
    Search(search::SearchArgs),
    /// Import entities and relations from a JSON file
    Import(io::ImportArgs),
    /// Export the whole graph as JSON
    Export(io::ExportArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Application context with the opened graph store
pub struct AppContext {
    pub graph: Arc<GraphStore>,
    pub config: Config,
}

impl AppContext {
    pub async fn new(cli: &Cli, config: Config) -> anyhow::Result<Self> {
        let data_dir = config.data_dir(cli.data_dir.as_deref());
        std::fs::create_dir_all(&data_dir)?;

        let db_path = config.database_path(&data_dir);
        tracing::debug!("Using database at: {:?}", db_path);

        let store = RedbVectorStore::open(&db_path)?.with_dimensions(config.embedding.dimensions);
        let embedder = HashingEmbedder::new(config.embedding.clone())?;
        let graph = KnowledgeGraphStore::new(store, embedder);
        graph.initialize().await?;

        Ok(Self {
            graph: Arc::new(graph),
            config,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // stdout carries protocol frames under `serve`
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    tracing::debug!("Starting trellis CLI");

    let config_path = cli.config_path();
    match &cli.command {
        Commands::Config(args) => return commands::config::run(args, &config_path),
        Commands::Completions(args) => return completions::run(args),
        _ => {}
    }

    let config = Config::load(&config_path)?;
    let ctx = AppContext::new(&cli, config).await?;

    match &cli.command {
        Commands::Serve => {
            let assembler = ResponseAssembler::new(ctx.config.response.clone())?;
            let server = McpServer::new(ctx.graph.clone(), assembler);
            server.run_stdio().await?;
        }
        Commands::Graph(args) => graph::run(args, &cli, &ctx).await?,
        Commands::Search(args) => search::run(args, &cli, &ctx).await?,
        Commands::Import(args) => io::run_import(args, &cli, &ctx).await?,
        Commands::Export(args) => io::run_export(args, &ctx).await?,
        Commands::Config(_) | Commands::Completions(_) => {}
    }

    Ok(())
}
