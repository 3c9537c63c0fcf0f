use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing::info;

use textquarry::core::config::EngineConfig;
use textquarry::crawl::crawler::WebCrawler;
use textquarry::crawl::fetcher::PageFetcher;
use textquarry::index::concurrent::SharedIndex;
use textquarry::index::inverted::InvertedIndex;
use textquarry::ingest::builder;
use textquarry::output::json;
use textquarry::parallel::queue::WorkQueue;
use textquarry::query::processor::{ConcurrentQueryProcessor, QueryProcessor};

/// Single-node search engine: index text files or crawled pages, then
/// answer ranked exact or prefix queries.
#[derive(Parser, Debug)]
#[command(name = "textquarry", version, about)]
struct Args {
    /// File or directory of .txt/.text files to index
    #[arg(long)]
    text: Option<PathBuf>,

    /// Seed URI to crawl
    #[arg(long)]
    html: Option<String>,

    /// Maximum number of pages to crawl
    #[arg(long, default_value_t = 1)]
    crawl: usize,

    /// File of queries, one per line
    #[arg(long)]
    query: Option<PathBuf>,

    /// Match query stems as prefixes instead of exactly
    #[arg(long)]
    partial: bool,

    /// Worker threads; presence selects the threaded pipeline
    #[arg(long, num_args = 0..=1, default_missing_value = "5")]
    threads: Option<usize>,

    /// Write per-location token counts as JSON
    #[arg(long, num_args = 0..=1, default_missing_value = "counts.json")]
    counts: Option<PathBuf>,

    /// Write the inverted index as JSON
    #[arg(long, num_args = 0..=1, default_missing_value = "index.json")]
    index: Option<PathBuf>,

    /// Write memoized query results as JSON
    #[arg(long, num_args = 0..=1, default_missing_value = "results.json")]
    results: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let start = Instant::now();

    // Crawling needs the shared pipeline even without an explicit
    // --threads.
    if args.threads.is_some() || args.html.is_some() {
        run_threaded(&args);
    } else {
        run_sequential(&args);
    }

    println!("Elapsed: {:.3} seconds", start.elapsed().as_secs_f64());
}

fn run_sequential(args: &Args) {
    let mut index = InvertedIndex::new();

    if let Some(path) = &args.text {
        info!("building index from {}", path.display());
        match builder::build_path(path, &mut index) {
            Ok(()) => info!("index built: {} words", index.num_words()),
            Err(err) => eprintln!("error processing input files: {}", err),
        }
    }

    let mut processor = QueryProcessor::new(&index);
    if let Some(path) = &args.query {
        if let Err(err) = processor.process_file(path, args.partial) {
            eprintln!("error processing queries: {}", err);
        }
    }

    if let Some(path) = &args.counts {
        if let Err(err) = json::write_counts(&index.counts(), path) {
            eprintln!("error writing counts: {}", err);
        }
    }
    if let Some(path) = &args.index {
        if let Err(err) = json::write_index(&index, path) {
            eprintln!("error writing index: {}", err);
        }
    }
    if let Some(path) = &args.results {
        if let Err(err) = processor.write_results(args.partial, path) {
            eprintln!("error writing results: {}", err);
        }
    }
}

fn run_threaded(args: &Args) {
    let config = EngineConfig {
        threads: args.threads.unwrap_or(5).max(1),
        crawl_limit: args.crawl.max(1),
        ..EngineConfig::default()
    };
    info!("threaded pipeline with {} workers", config.threads);

    let queue = Arc::new(WorkQueue::new(config.threads));
    let index = Arc::new(SharedIndex::new());

    if let Some(path) = &args.text {
        match builder::build(path, &index, &queue) {
            Ok(()) => info!("index built: {} words", index.num_words()),
            Err(err) => eprintln!("error processing input files: {}", err),
        }
    }

    if let Some(seed) = &args.html {
        match PageFetcher::new(&config) {
            Ok(fetcher) => {
                let crawler = WebCrawler::new(
                    Arc::clone(&index),
                    Arc::clone(&queue),
                    fetcher,
                    config.crawl_limit,
                );
                match crawler.crawl(seed) {
                    Ok(()) => {
                        queue.finish();
                        info!("crawl complete: {} pages", crawler.num_crawled());
                    }
                    Err(err) => eprintln!("invalid seed URI {}: {}", seed, err),
                }
            }
            Err(err) => eprintln!("error initializing fetcher: {}", err),
        }
    }

    let processor = ConcurrentQueryProcessor::new(Arc::clone(&index), Arc::clone(&queue));
    if let Some(path) = &args.query {
        if let Err(err) = processor.process_file(path, args.partial) {
            eprintln!("error processing queries: {}", err);
        }
    }

    if let Some(path) = &args.counts {
        if let Err(err) = json::write_counts(&index.counts(), path) {
            eprintln!("error writing counts: {}", err);
        }
    }
    if let Some(path) = &args.index {
        if let Err(err) = json::write_index(&*index, path) {
            eprintln!("error writing index: {}", err);
        }
    }
    if let Some(path) = &args.results {
        if let Err(err) = processor.write_results(args.partial, path) {
            eprintln!("error writing results: {}", err);
        }
    }

    queue.shutdown();
    queue.join();
}
