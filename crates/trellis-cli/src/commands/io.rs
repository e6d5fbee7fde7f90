//! Import/Export commands

use std::io::Write;
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use anyhow::Context;
use clap::Args;
use serde::{Deserialize, Serialize};
use trellis_core::limits::{MAX_BATCH_ENTITIES, MAX_BATCH_RELATIONS};
use trellis_core::{NewEntity, Relation};

use crate::output::{print_json, OutputFormat};
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct ImportArgs {
    /// Input file: {"entities": [...], "relations": [...]}
    pub file: PathBuf,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Output file (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Import file layout; observations may be omitted
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImportData {
    pub entities: Vec<NewEntity>,
    pub relations: Vec<Relation>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportSummary {
    entities_created: usize,
    entities_skipped: usize,
    relations_created: usize,
    relations_skipped: usize,
}

pub async fn run_import(args: &ImportArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    tracing::info!("Importing from {:?}", args.file);

    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let data: ImportData = serde_json::from_str(&content)
        .with_context(|| format!("Invalid import file {}", args.file.display()))?;

    let mut summary = ImportSummary::default();

    // Entities first so relations never dangle mid-import
    let mut entities = data.entities.into_iter().peekable();
    while entities.peek().is_some() {
        let batch: Vec<NewEntity> = entities.by_ref().take(MAX_BATCH_ENTITIES).collect();
        let requested = batch.len();
        let created = ctx.graph.create_entities(batch).await?;
        summary.entities_created += created.len();
        summary.entities_skipped += requested - created.len();
    }

    let mut relations = data.relations.into_iter().peekable();
    while relations.peek().is_some() {
        let batch: Vec<Relation> = relations.by_ref().take(MAX_BATCH_RELATIONS).collect();
        let requested = batch.len();
        let created = ctx.graph.create_relations(batch).await?;
        summary.relations_created += created.len();
        summary.relations_skipped += requested - created.len();
    }

    tracing::info!(
        "Imported {} entities and {} relations",
        summary.entities_created,
        summary.relations_created
    );

    match cli.format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => println!(
            "Imported {} entities and {} relations from {:?} ({} entities and {} relations already existed)",
            summary.entities_created,
            summary.relations_created,
            args.file,
            summary.entities_skipped,
            summary.relations_skipped
        ),
    }
    Ok(())
}

/// Write the full graph in the import layout
pub async fn run_export(args: &ExportArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let graph = ctx.graph.read_graph().await?;
    tracing::debug!(
        "Exporting {} entities, {} relations",
        graph.entities.len(),
        graph.relations.len()
    );
    let content = serde_json::to_string_pretty(&graph)?;

    if let Some(ref path) = args.output {
        // Owner read/write only
        #[cfg(unix)]
        {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(path)?;
            file.write_all(content.as_bytes())?;
        }
        #[cfg(not(unix))]
        {
            std::fs::write(path, &content)?;
        }
        println!("Exported to {:?}", path);
    } else {
        println!("{}", content);
    }

    Ok(())
}
