use clap::Parser;
use quill_context::{ChunkConfig, NormalizeMode, Normalizer, TextSplitter};
use std::fs;
use std::io::{self, Read};

/// Normalize and chunk a text file, printing the chunks as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Maximum length for each chunk, in bytes of normalized text.
    #[arg(short, long, default_value_t = 1000)]
    chunk_size: usize,

    /// Bytes shared between consecutive chunks.
    #[arg(short, long, default_value_t = 200)]
    overlap: usize,

    /// Apply the stricter keyword normalization instead of the readable one.
    #[arg(long)]
    keyword: bool,

    /// Print the normalized text instead of chunking it.
    #[arg(long)]
    normalize_only: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let raw = if let Some(input_path) = args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let mode = if args.keyword {
        NormalizeMode::Keyword
    } else {
        NormalizeMode::Readable
    };
    let normalized = Normalizer::new(mode).normalize(&raw);

    if args.normalize_only {
        println!("{normalized}");
        return Ok(());
    }

    let splitter = TextSplitter::new(ChunkConfig::new(args.chunk_size, args.overlap))?;
    let chunks = splitter.split(&normalized);
    println!("{}", serde_json::to_string_pretty(&chunks)?);

    Ok(())
}
