//! textquarry is a single-node search engine. Text files and crawled web
//! pages are tokenized, stemmed, and folded into an inverted index that
//! answers ranked multi-word queries in exact or prefix mode.
//!
//! Ingestion is parallel: worker tasks build lock-free local indexes and
//! merge them into the shared index under a fair read/write lock, so the
//! CPU-bound tokenization phase never contends on shared state.

pub mod analysis;
pub mod core;
pub mod crawl;
pub mod index;
pub mod ingest;
pub mod output;
pub mod parallel;
pub mod query;
