use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use kodex_core::{Config, IndexMode, PipelineContext};
use kodex_index::ChunkFilters;

#[derive(Parser, Debug)]
#[command(name = "kodex", version)]
#[command(about = "Index Android/JVM source trees and search them by meaning")]
struct Cli {
    /// Path to the configuration file (default: `$KODEX_CONFIG` or `kodex.toml`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chunk, embed and index a project.
    Index {
        #[arg(long)]
        project: String,
        /// Project root directory.
        #[arg(long)]
        root: PathBuf,
        /// Folder to scan instead of the configured source roots (repeatable).
        #[arg(long = "folder")]
        folders: Vec<String>,
        /// Only index files whose path ends with this suffix (repeatable).
        #[arg(long = "path")]
        paths: Vec<String>,
        /// Append to the existing index instead of rebuilding it.
        #[arg(long)]
        append: bool,
    },
    /// Retrieve the chunks closest to a query.
    Search {
        #[arg(long)]
        project: String,
        /// Number of results (default: `index.top_k`).
        #[arg(short)]
        k: Option<usize>,
        /// Print hits as JSON.
        #[arg(long)]
        json: bool,
        query: String,
    },
    /// Show index statistics.
    Stats {
        #[arg(long)]
        project: String,
    },
}

fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config);
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    tracing::debug!(path = %config_path.display(), "config loaded");

    let mut ctx = PipelineContext::new(config).context("failed to initialise pipeline")?;

    match cli.command {
        Command::Index {
            project,
            root,
            folders,
            paths,
            append,
        } => {
            let filters = ChunkFilters {
                folders: non_empty(folders),
                paths: non_empty(paths),
            };
            let mode = if append {
                IndexMode::Append
            } else {
                IndexMode::Rebuild
            };
            let report = ctx
                .index_project(&project, &root, &filters, mode)
                .with_context(|| format!("indexing {project} failed"))?;
            for error in &report.chunking.errors {
                eprintln!("skipped: {error}");
            }
            println!(
                "{}: {} files, {} chunks added, {} total (dim {}, version {}) in {}ms",
                report.project_id,
                report.chunking.files_chunked,
                report.vectors_added,
                report.total_vectors,
                report.dimension,
                report.version,
                report.duration_ms
            );
        }
        Command::Search {
            project,
            k,
            json,
            query,
        } => {
            let hits = ctx
                .retrieve(&project, &query, k)
                .with_context(|| format!("search in {project} failed"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else if hits.is_empty() {
                println!("no results");
            } else {
                for hit in hits {
                    let chunk = &hit.chunk;
                    println!(
                        "{:.4}  {}:{}-{}  {}",
                        hit.distance,
                        chunk.path,
                        chunk.start_line + 1,
                        chunk.end_line + 1,
                        chunk.metadata.signature.as_deref().unwrap_or(chunk.node_type.as_str())
                    );
                }
            }
        }
        Command::Stats { project } => {
            let stats = ctx
                .stats(&project)
                .with_context(|| format!("reading index of {project} failed"))?;
            println!("project:  {}", stats.project_id);
            println!("vectors:  {}", stats.total_vectors);
            println!("records:  {}", stats.metadata_count);
            println!("dim:      {}", stats.dimension);
            println!("version:  {}", stats.version);
        }
    }

    Ok(())
}

fn resolve_config_path(arg: Option<PathBuf>) -> PathBuf {
    if let Some(path) = arg {
        return path;
    }
    if let Ok(path) = std::env::var("KODEX_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("kodex.toml")
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    if values.is_empty() { None } else { Some(values) }
}
