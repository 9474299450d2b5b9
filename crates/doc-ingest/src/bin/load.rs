//! Directory loader: run one format extractor over a corpus and persist the chunks
//!
//! Run with: cargo run -p doc-ingest --features cli --bin doc-ingest-load -- --help

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use doc_ingest::codec::{chunk_to_markdown, save_chunks, save_chunks_json};
use doc_ingest::config::IngestConfig;
use doc_ingest::loader::{Extractor, ExtractorKind, Loader, LoaderConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One pretty JSON array per source file
    Json,
    /// One binary snapshot per source file
    Snapshot,
    /// One front-matter markdown file per chunk
    Markdown,
}

#[derive(Parser)]
#[command(name = "doc-ingest-load", about = "Extract chunks from every matching file in a directory")]
struct Cli {
    /// Extractor to run: docx, pptx, pdf, msg or xlsx
    #[arg(long)]
    kind: ExtractorKind,
    /// Corpus root
    #[arg(long)]
    input: PathBuf,
    /// Directory receiving the chunk files
    #[arg(long)]
    output: PathBuf,
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,
    /// Only walk direct children of the input directory
    #[arg(long)]
    flat: bool,
    /// Worker threads (defaults to the configured value)
    #[arg(long)]
    threads: Option<usize>,
    /// Basenames to skip (repeatable)
    #[arg(long = "exclude")]
    exclude: Vec<String>,
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_ingest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => IngestConfig::load(path)?,
        None => IngestConfig::from_env()?,
    };

    let mut exclude = config.loader.exclude_files.clone();
    exclude.extend(cli.exclude.iter().cloned());

    let loader_config = LoaderConfig::new(&cli.input)
        .recursive(!cli.flat && config.loader.recursive)
        .extensions(cli.kind.default_extensions().iter().copied())
        .exclude_files(exclude)
        .num_threads(cli.threads.unwrap_or(config.loader.num_threads));

    let mut loader = Loader::new(loader_config, Extractor::for_kind(cli.kind, &config.pdf))?;
    let loaded = loader.load();

    fs::create_dir_all(&cli.output)
        .with_context(|| format!("creating {}", cli.output.display()))?;

    let mut total = 0usize;
    for (path, chunks) in loaded {
        let stem = output_stem(&cli.input, path);
        match cli.format {
            OutputFormat::Json => save_chunks_json(chunks, cli.output.join(format!("{}.json", stem)))?,
            OutputFormat::Snapshot => save_chunks(chunks, cli.output.join(format!("{}.bin", stem)))?,
            OutputFormat::Markdown => {
                for (index, chunk) in chunks.iter().enumerate() {
                    chunk_to_markdown(chunk, cli.output.join(format!("{}_{}.md", stem, index + 1)))?;
                }
            }
        }
        total += chunks.len();
    }

    println!(
        "Loaded {} {} files, {} chunks into {}",
        loaded.len(),
        cli.kind.name(),
        total,
        cli.output.display()
    );
    Ok(())
}

/// Flat output name for a source file: its path under the input root with separators replaced
fn output_stem(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace(['/', '\\'], "__")
}
