use clap::{Args, Parser, Subcommand};
use interlinear_sync::{
    alignment::{AlignmentGroup, PanelRole},
    config::SyncConfig,
    diagnostics::Diagnostic,
    extractor::WordToken,
    loader::{ChapterLoader, InMemorySource},
    pipeline::{ChapterResult, DocumentPipeline},
    Error, InternalResult,
};
use serde::Serialize;
use std::{path::PathBuf, sync::Arc};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the word tokens of a document
    Tokens(DocumentArgs),

    /// Print the alignment groups of a document
    Groups(DocumentArgs),

    /// Print parse errors and data-quality warnings
    Diagnostics(DocumentArgs),
}

#[derive(Args)]
struct DocumentArgs {
    /// Markup file (a book, or one chapter with --chapter)
    file: PathBuf,

    /// Book code, e.g. TIT
    #[arg(short, long)]
    book: String,

    /// Treat the file as this chapter
    #[arg(long)]
    chapter: Option<u32>,

    /// Panel role of the document
    #[arg(long, default_value = "target")]
    role: PanelRole,

    /// Include whitespace and punctuation pseudo-tokens
    #[arg(long)]
    all: bool,
}

fn load_config(cli: &Cli) -> InternalResult<SyncConfig> {
    match &cli.config {
        Some(path) => {
            let config = SyncConfig::from_file(path)?;
            info!("config loaded from {}", path.display());
            Ok(config)
        }
        None => Ok(SyncConfig::default()),
    }
}

async fn load_chapters(config: &SyncConfig, args: &DocumentArgs) -> InternalResult<Vec<ChapterResult>> {
    let markup = std::fs::read_to_string(&args.file).map_err(|e| {
        Error::internal(format!("Failed to read {}: {}", args.file.display(), e))
    })?;
    let pipeline = DocumentPipeline::new(config, args.role);

    match args.chapter {
        Some(chapter) => {
            let source = InMemorySource::new().with_chapter(&args.book, chapter, markup);
            let loader = ChapterLoader::new(Arc::new(source), pipeline, args.file.display().to_string());
            Ok(vec![loader.load_chapter(&args.book, chapter).await?])
        }
        None => Ok(pipeline.process_book(&args.book, &markup).chapters),
    }
}

fn print_json<T: Serialize>(value: &T) -> InternalResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| Error::internal(format!("Failed to serialize output: {}", e)))?;
    println!("{}", json);
    Ok(())
}

async fn run(cli: &Cli) -> InternalResult<()> {
    let config = load_config(cli)?;
    debug!("config: {:?}", config);

    match &cli.command {
        Commands::Tokens(args) => {
            let chapters = load_chapters(&config, args).await?;
            let tokens: Vec<&WordToken> = chapters
                .iter()
                .flat_map(|c| c.tokens())
                .filter(|t| args.all || t.is_highlightable)
                .collect();
            print_json(&tokens)
        }
        Commands::Groups(args) => {
            let chapters = load_chapters(&config, args).await?;
            let groups: Vec<&AlignmentGroup> =
                chapters.iter().flat_map(|c| c.index.groups()).collect();
            print_json(&groups)
        }
        Commands::Diagnostics(args) => {
            let chapters = load_chapters(&config, args).await?;
            let diagnostics: Vec<&Diagnostic> =
                chapters.iter().flat_map(|c| c.diagnostics()).collect();
            for diagnostic in &diagnostics {
                debug!("{}", diagnostic);
            }
            print_json(&diagnostics)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
