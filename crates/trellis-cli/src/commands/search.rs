//! Search commands

use clap::Args;
use trellis_core::SearchQuery;
use trellis_search::{ExactSearchEngine, SearchEngine, SemanticSearch};

use crate::output::{entity_line, hit_line, print_json, OutputFormat};
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Filter by entity type (can be used multiple times)
    #[arg(short = 't', long = "type")]
    pub types: Vec<String>,

    /// Limit results
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Minimum similarity (0.0-1.0)
    #[arg(long, default_value = "0.0")]
    pub threshold: f32,

    /// Case-insensitive substring match instead of semantic search
    #[arg(long)]
    pub exact: bool,
}

pub async fn run(args: &SearchArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let query = SearchQuery::new(&args.query)
        .with_entity_types(args.types.clone())
        .with_limit(args.limit)
        .with_similarity_threshold(args.threshold);

    if args.exact {
        let graph = ctx.graph.read_graph().await?;
        let results = ExactSearchEngine::new()
            .search(&query, &graph.entities)
            .await?;
        tracing::info!("Exact search returned {} results", results.len());

        return match cli.format {
            OutputFormat::Json => print_json(&results),
            OutputFormat::Text if results.is_empty() => {
                println!("No results found");
                Ok(())
            }
            OutputFormat::Text => {
                println!("Search results for '{}' ({} found):", args.query, results.len());
                for entity in &results {
                    println!("  {}", entity_line(entity));
                }
                Ok(())
            }
        };
    }

    let hits = SemanticSearch::new(ctx.graph.clone()).search(&query).await?;
    tracing::info!("Semantic search returned {} hits", hits.len());

    match cli.format {
        OutputFormat::Json => print_json(&hits)?,
        OutputFormat::Text if hits.is_empty() => println!("No results found"),
        OutputFormat::Text => {
            println!("Search results for '{}' ({} found):", args.query, hits.len());
            for hit in &hits {
                println!("  {}", hit_line(hit));
            }
        }
    }
    Ok(())
}
