use anyhow::Result;
use clap::{Parser, ValueEnum};
use quill_context::{ChunkConfig, NormalizeMode};
use quill_embed::{
    EmbedConfig, EmbeddingProvider, FastEmbedProvider, HttpEmbeddingProvider, RemoteEmbedConfig,
};
use quill_retriever::{PlainTextLoader, RetrievalConfig, RetrievalEngine};
use quill_server::generate::MistralGenerator;
use quill_server::{ServerConfig, run_server};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EmbeddingBackend {
    /// In-process fastembed ONNX model.
    Local,
    /// Remote embeddings API.
    Remote,
}

/// Question answering over a single document.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the source document (text or pdftotext output).
    #[arg(long)]
    document: PathBuf,

    /// Directory holding persisted indexes.
    #[arg(long, default_value = "indexes")]
    index_dir: PathBuf,

    /// Index name; defaults to the document file stem.
    #[arg(long)]
    name: Option<String>,

    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: SocketAddr,

    /// Passages retrieved per question.
    #[arg(short, long, default_value_t = 3)]
    k: usize,

    /// Maximum chunk length in bytes of normalized text.
    #[arg(long, default_value_t = 1000)]
    chunk_size: usize,

    /// Bytes shared between consecutive chunks.
    #[arg(long, default_value_t = 200)]
    overlap: usize,

    /// Use the stricter keyword normalization.
    #[arg(long)]
    keyword: bool,

    /// Which embedding backend to use.
    #[arg(long, value_enum, default_value_t = EmbeddingBackend::Local)]
    embedding: EmbeddingBackend,

    /// Embedding model name (local backend) or identifier (remote).
    #[arg(long, default_value = "all-MiniLM-L6-v2")]
    embedding_model: String,

    /// Base URL of the remote embeddings API (remote backend only);
    /// credentials come from QUILL_EMBED_API_KEY.
    #[arg(long)]
    embedding_url: Option<String>,

    /// Generation model sent to the Mistral API.
    #[arg(long, default_value = "mistral-small-latest")]
    generation_model: String,

    /// Build the index at startup instead of on the first question.
    #[arg(long)]
    prebuild: bool,

    /// Ceiling in seconds for one question's embedding + generation work.
    #[arg(long, default_value_t = 60)]
    request_timeout: u64,
}

async fn embedding_provider(args: &Args) -> Result<Arc<dyn EmbeddingProvider>> {
    match args.embedding {
        EmbeddingBackend::Local => {
            let provider =
                FastEmbedProvider::create(EmbedConfig::new(&args.embedding_model)).await?;
            Ok(Arc::new(provider))
        }
        EmbeddingBackend::Remote => {
            let base_url = args.embedding_url.clone().ok_or_else(|| {
                anyhow::anyhow!("--embedding-url is required with the remote backend")
            })?;
            let mut config = RemoteEmbedConfig::new(base_url, &args.embedding_model);
            if let Ok(key) = std::env::var("QUILL_EMBED_API_KEY") {
                config = config.with_api_key(key);
            }
            let provider = HttpEmbeddingProvider::connect(config).await?;
            Ok(Arc::new(provider))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let timeout = Duration::from_secs(args.request_timeout);

    // Secrets are read here, once; a missing key kills the process before
    // it accepts a single request.
    let generator = Arc::new(MistralGenerator::from_env(&args.generation_model, timeout)?);
    let provider = embedding_provider(&args).await?;

    let index_name = args.name.clone().unwrap_or_else(|| {
        args.document
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    });
    let mode = if args.keyword {
        NormalizeMode::Keyword
    } else {
        NormalizeMode::Readable
    };

    let retrieval_config = RetrievalConfig::new(&index_name, &args.index_dir)
        .with_chunking(ChunkConfig::new(args.chunk_size, args.overlap))
        .with_normalize_mode(mode)
        .with_default_k(args.k);
    let loader = Arc::new(PlainTextLoader::new(&args.document));
    let engine = Arc::new(RetrievalEngine::new(retrieval_config, loader, provider)?);

    if args.prebuild {
        info!("prebuilding index {index_name}");
        engine.prebuild().await?;
    }

    let server_config = ServerConfig {
        bind_addr: args.bind,
        k: args.k,
        request_timeout: timeout,
    };
    run_server(server_config, engine, generator).await
}
