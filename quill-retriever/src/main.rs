use clap::{Parser, Subcommand};
use quill_context::{ChunkConfig, NormalizeMode};
use quill_embed::{EmbedConfig, FastEmbedProvider};
use quill_retriever::{
    IndexStore, PlainTextLoader, RetrievalConfig, RetrievalEngine, SearchHit,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Build and query quill document indexes from the command line.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding persisted indexes.
    #[arg(long, default_value = "indexes")]
    index_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build (or rebuild) the index for a document.
    Build {
        /// Path to the source document (text or pdftotext output).
        #[arg(long)]
        document: PathBuf,
        /// Index name; defaults to the document file stem.
        #[arg(long)]
        name: Option<String>,
        /// Maximum chunk length in bytes of normalized text.
        #[arg(long, default_value_t = 1000)]
        chunk_size: usize,
        /// Bytes shared between consecutive chunks.
        #[arg(long, default_value_t = 200)]
        overlap: usize,
        /// Use the stricter keyword normalization.
        #[arg(long)]
        keyword: bool,
        /// Embedding model to load.
        #[arg(long, default_value = "all-MiniLM-L6-v2")]
        model: String,
        /// Delete any existing index first.
        #[arg(long)]
        force: bool,
    },
    /// Ask a question against a document's index, building it if absent.
    Query {
        /// The question to embed and search with.
        #[arg(long)]
        question: String,
        /// Path to the source document (used if the index must be built).
        #[arg(long)]
        document: PathBuf,
        /// Index name; defaults to the document file stem.
        #[arg(long)]
        name: Option<String>,
        /// Number of passages to return.
        #[arg(short, long, default_value_t = 3)]
        k: usize,
        /// Embedding model to load.
        #[arg(long, default_value = "all-MiniLM-L6-v2")]
        model: String,
        /// Emit results as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },
    /// Show metadata for a persisted index.
    Stats {
        /// Index name.
        #[arg(long)]
        name: String,
    },
}

fn default_name(document: &Path, name: Option<String>) -> String {
    name.unwrap_or_else(|| {
        document
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match args.command {
        Commands::Build {
            document,
            name,
            chunk_size,
            overlap,
            keyword,
            model,
            force,
        } => {
            let name = default_name(&document, name);
            let store = IndexStore::new(&args.index_dir);
            if force && store.delete(&name).await? {
                println!("deleted existing index {name}");
            }

            let mode = if keyword {
                NormalizeMode::Keyword
            } else {
                NormalizeMode::Readable
            };
            let config = RetrievalConfig::new(&name, &args.index_dir)
                .with_chunking(ChunkConfig::new(chunk_size, overlap))
                .with_normalize_mode(mode);
            let provider = Arc::new(FastEmbedProvider::create(EmbedConfig::new(model)).await?);
            let engine =
                RetrievalEngine::new(config, Arc::new(PlainTextLoader::new(document)), provider)?;

            engine.prebuild().await?;
            let stats = engine.index_stats().expect("index was just built");
            println!(
                "index {} ready: {} chunks, dimension {}",
                stats.name, stats.chunks, stats.dimension
            );
        }
        Commands::Query {
            question,
            document,
            name,
            k,
            model,
            json,
        } => {
            let name = default_name(&document, name);
            let config = RetrievalConfig::new(&name, &args.index_dir).with_default_k(k);
            let provider = Arc::new(FastEmbedProvider::create(EmbedConfig::new(model)).await?);
            let engine =
                RetrievalEngine::new(config, Arc::new(PlainTextLoader::new(document)), provider)?;

            let hits = engine.query(&question, k).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                print_hits(&hits);
            }
        }
        Commands::Stats { name } => {
            let store = IndexStore::new(&args.index_dir);
            let index = store.load(&name).await?;
            let metadata = index.metadata();
            println!("index:      {}", metadata.name);
            println!("provider:   {}", metadata.provider);
            println!("dimension:  {}", metadata.dimension);
            println!("chunks:     {}", index.len());
            println!(
                "chunking:   {} bytes, {} overlap",
                metadata.chunk_size, metadata.overlap
            );
            println!("version:    {}", metadata.version);
        }
    }

    Ok(())
}

fn print_hits(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("no results");
        return;
    }
    for (rank, hit) in hits.iter().enumerate() {
        let page = hit
            .page
            .map(|p| format!("page {p}"))
            .unwrap_or_else(|| "unpaged".to_string());
        println!(
            "#{} score {:.4} ({page}, offset {})",
            rank + 1,
            hit.score,
            hit.offset
        );
        println!("{}", hit.text.trim());
        println!();
    }
}
