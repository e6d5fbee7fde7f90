//! Token-bounded graph views

use clap::Args;
use trellis_response::{GraphRequest, ResponseAssembler};

use crate::{AppContext, Cli};

#[derive(Args)]
pub struct GraphArgs {
    /// View mode: smart, entities, relationships, raw
    #[arg(short, long, default_value = "smart")]
    pub mode: String,

    /// Only include entities of this type (can be used multiple times)
    #[arg(short = 't', long = "type")]
    pub types: Vec<String>,

    /// Maximum number of items in entities/relationships mode
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Token limit, overriding response.max_tokens
    #[arg(long)]
    pub max_tokens: Option<usize>,

    /// Pretty-print the view
    #[arg(long)]
    pub pretty: bool,
}

impl GraphArgs {
    fn request(&self) -> GraphRequest {
        GraphRequest {
            mode: Some(self.mode.clone()),
            entity_types: (!self.types.is_empty()).then(|| self.types.clone()),
            limit: self.limit,
        }
    }
}

/// Print the view on stdout and its meta on stderr
pub async fn run(args: &GraphArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let mut config = ctx.config.response.clone();
    if let Some(max_tokens) = args.max_tokens {
        config.max_tokens = max_tokens;
    }
    let assembler = ResponseAssembler::new(config)?;

    let graph = ctx.graph.read_graph().await?;
    let response = assembler.build_request(&graph.entities, &graph.relations, &args.request());

    let content = if args.pretty {
        serde_json::to_string_pretty(&response.content)?
    } else {
        serde_json::to_string(&response.content)?
    };
    println!("{}", content);

    if !cli.quiet {
        eprintln!("<!-- meta: {} -->", serde_json::to_string(&response.meta)?);
    }
    Ok(())
}
