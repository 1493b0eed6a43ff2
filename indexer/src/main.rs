use anyhow::Result;
use clap::{Parser, Subcommand};
use facsearch_core::persist::{load_context, load_records, save_index, IndexPaths, TermStore};
use facsearch_core::{build_index, EnglishNormalizer, LemmatizerKind, Normalizer, RankedResult, TfidfVectorizer};
use tracing_subscriber::{fmt, EnvFilter};

use std::io::{self, BufRead, Write};

#[derive(Parser)]
#[command(name = "facsearch-indexer")]
#[command(about = "Build and query the faculty profile TF-IDF index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from crawled faculty records (JSON/JSONL file or directory)
    Build {
        /// Record store path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long, default_value = "./index")]
        output: String,
        /// Base-form reduction applied to documents and queries
        #[arg(long, default_value_t = LemmatizerKind::Morphy)]
        lemmatizer: LemmatizerKind,
    },
    /// Prompt for queries and print the best matching profiles
    Search {
        /// Index directory
        #[arg(long, default_value = "./index")]
        index: String,
        /// Run a single query instead of prompting
        #[arg(long)]
        query: Option<String>,
    },
    /// Print the stored term index records for a term, one JSON object per line
    Terms {
        /// Index directory
        #[arg(long, default_value = "./index")]
        index: String,
        term: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, lemmatizer } => build(&input, &output, lemmatizer),
        Commands::Search { index, query } => run_search(&index, query),
        Commands::Terms { index, term } => print_terms(&index, &term),
    }
}

fn build(input: &str, output: &str, lemmatizer: LemmatizerKind) -> Result<()> {
    let records = load_records(input)?;
    tracing::info!(input, records = records.len(), %lemmatizer, "loaded faculty records");

    let normalizer = EnglishNormalizer::new(lemmatizer);
    let build = build_index(&records, &normalizer, &TfidfVectorizer::default())?;
    if build.skipped > 0 {
        tracing::warn!(skipped = build.skipped, "records without about or accolade text were not indexed");
    }

    let paths = IndexPaths::new(output);
    let terms = TermStore::open(&paths)?;
    let meta = save_index(&paths, &build, lemmatizer, &terms)?;
    tracing::info!(output, num_docs = meta.num_docs, num_terms = meta.num_terms, "index build complete");
    Ok(())
}

fn run_search(index: &str, query: Option<String>) -> Result<()> {
    let (ctx, meta) = load_context(&IndexPaths::new(index))?;
    tracing::debug!(index, num_docs = meta.num_docs, created_at = %meta.created_at, "loaded index");

    if let Some(q) = query {
        print_results(&ctx.search(&q));
        return Ok(());
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("Enter your search query: ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        if line.trim().is_empty() {
            break;
        }
        print_results(&ctx.search(&line));
    }
    Ok(())
}

fn print_results(results: &[RankedResult]) {
    for r in results {
        println!("Professor: {}", r.name);
        println!("Profile Link: {}", r.profile_link);
        println!("About (Truncated to 50 Words): {}", r.snippet);
        println!("Similarity Score: {:.4}", r.similarity);
        println!("{}", "-".repeat(80));
    }
}

fn print_terms(index: &str, term: &str) -> Result<()> {
    let paths = IndexPaths::new(index);
    let (ctx, _) = load_context(&paths)?;
    let key = ctx.normalizer.normalize(term);
    let records = TermStore::open(&paths)?.lookup(&key)?;
    if records.is_empty() {
        tracing::info!(term = %key, "term not in index");
    }
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for r in records {
        serde_json::to_writer(&mut out, &r)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}
