use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use lsp_types::Position;
use tracing::info;

use crane::config::Settings;
use crane::lsp::{offset_at, CompletionService};
use crane::reflection::workspace::MemoryWorkspace;

#[derive(Parser)]
#[command(name = "crane", about = "Context-aware completion for PHP sources.")]
struct Cli {
    /// Workspace root (defaults to current)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Settings file, used instead of ~/.crane and .crane/settings.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print completion items for a cursor position as JSON
    Complete {
        file: PathBuf,

        /// Byte offset of the cursor
        #[arg(long, conflicts_with_all = ["line", "character"])]
        offset: Option<usize>,

        /// Zero-based line of the cursor
        #[arg(long, requires = "character")]
        line: Option<u32>,

        /// Zero-based UTF-16 column of the cursor
        #[arg(long, requires = "line")]
        character: Option<u32>,

        /// Only reflect FILE itself, not the whole workspace
        #[arg(long)]
        no_scan: bool,
    },
    /// Reflect every workspace file and print a summary
    Scan,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = cli
        .root
        .canonicalize()
        .with_context(|| format!("workspace root {}", cli.root.display()))?;
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load(&root)?,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(settings.log_directive().parse()?),
        )
        .init();

    info!("crane starting in {}", root.display());
    let workspace = Arc::new(MemoryWorkspace::new(&root, settings.clone()));

    match cli.command {
        Command::Scan => {
            let stats = workspace.scan().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Complete {
            file,
            offset,
            line,
            character,
            no_scan,
        } => {
            if !no_scan {
                workspace.scan().await?;
            }
            let path = file
                .canonicalize()
                .with_context(|| format!("source file {}", file.display()))?;
            let text = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let offset = match (offset, line, character) {
                (Some(offset), _, _) => offset,
                (None, Some(line), Some(character)) => {
                    offset_at(&text, Position::new(line, character))
                }
                _ => bail!("give either --offset or --line with --character"),
            };

            let filename = workspace.resolve_uri(&path.to_string_lossy());
            let service = CompletionService::new(workspace, settings);
            let items = service.complete(&filename, &text, offset).await?;
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
    }

    Ok(())
}
