use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rust_stemmers::Stemmer;

use crate::analysis::stemmer;
use crate::core::error::{Error, ErrorKind, Result};
use crate::index::concurrent::SharedIndex;
use crate::index::inverted::{InvertedIndex, SearchResult};
use crate::output::json;
use crate::parallel::queue::WorkQueue;

type ResultMap = BTreeMap<String, Vec<SearchResult>>;

/// Memoized results, one map per search mode.
#[derive(Default)]
struct Memo {
    exact: ResultMap,
    partial: ResultMap,
}

impl Memo {
    fn mode(&self, partial: bool) -> &ResultMap {
        if partial {
            &self.partial
        } else {
            &self.exact
        }
    }

    fn mode_mut(&mut self, partial: bool) -> &mut ResultMap {
        if partial {
            &mut self.partial
        } else {
            &mut self.exact
        }
    }
}

/// Canonical query key: the sorted unique stems joined by single spaces.
fn canonical_key(stems: &BTreeSet<String>) -> String {
    stems
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sequential query processor. Each query line is normalized into a
/// canonical key; distinct keys trigger exactly one search per mode and
/// the result list is memoized for reads and for `write_results`.
pub struct QueryProcessor<'a> {
    index: &'a InvertedIndex,
    memo: Memo,
    stemmer: Stemmer,
}

impl<'a> QueryProcessor<'a> {
    pub fn new(index: &'a InvertedIndex) -> Self {
        QueryProcessor {
            index,
            memo: Memo::default(),
            stemmer: stemmer::english_stemmer(),
        }
    }

    /// Reads a query file line by line through `process_line`.
    pub fn process_file(&mut self, path: &Path, partial: bool) -> Result<()> {
        let file = File::open(path).map_err(|err| io_error(path, err))?;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|err| io_error(path, err))?;
            self.process_line(&line, partial);
        }
        Ok(())
    }

    /// Normalizes one query line and searches it unless the canonical key
    /// is empty or already memoized for this mode.
    pub fn process_line(&mut self, line: &str, partial: bool) {
        let stems = stemmer::unique_stems(line, &self.stemmer);
        if stems.is_empty() {
            return;
        }

        let key = canonical_key(&stems);
        if self.memo.mode(partial).contains_key(&key) {
            return;
        }

        let results = self.index.search(&stems, partial);
        self.memo.mode_mut(partial).insert(key, results);
    }

    /// Stored canonical queries for one mode, ascending.
    pub fn queries(&self, partial: bool) -> Vec<String> {
        self.memo.mode(partial).keys().cloned().collect()
    }

    /// Stored results for a query, which is re-canonicalized first; empty
    /// if the query was never processed.
    pub fn results(&self, query: &str, partial: bool) -> Vec<SearchResult> {
        let key = canonical_key(&stemmer::unique_stems(query, &self.stemmer));
        self.memo
            .mode(partial)
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn num_queries(&self, partial: bool) -> usize {
        self.memo.mode(partial).len()
    }

    pub fn num_results(&self, query: &str, partial: bool) -> usize {
        self.results(query, partial).len()
    }

    /// Writes the memoized results for one mode as JSON sorted by query.
    pub fn write_results(&self, partial: bool, path: &Path) -> Result<()> {
        json::write_results(self.memo.mode(partial), path)
    }
}

/// Multi-threaded query processor. `process_line` enqueues the whole
/// normalize-check-search-store sequence as one task; the memo map sits
/// behind a single mutex held only for the existence check and the
/// insert. Two workers racing on the same fresh query may both search,
/// but they compute identical values and the last insert wins.
pub struct ConcurrentQueryProcessor {
    index: Arc<SharedIndex>,
    queue: Arc<WorkQueue>,
    memo: Arc<Mutex<Memo>>,
}

impl ConcurrentQueryProcessor {
    pub fn new(index: Arc<SharedIndex>, queue: Arc<WorkQueue>) -> Self {
        ConcurrentQueryProcessor {
            index,
            queue,
            memo: Arc::new(Mutex::new(Memo::default())),
        }
    }

    /// Submits every line of the query file, then waits for the pending
    /// barrier so all results are stored on return.
    pub fn process_file(&self, path: &Path, partial: bool) -> Result<()> {
        let file = File::open(path).map_err(|err| io_error(path, err))?;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|err| io_error(path, err))?;
            self.process_line(&line, partial);
        }
        self.queue.finish();
        Ok(())
    }

    pub fn process_line(&self, line: &str, partial: bool) {
        let line = line.to_string();
        let index = Arc::clone(&self.index);
        let memo = Arc::clone(&self.memo);

        self.queue.execute(move || {
            let stemmer = stemmer::english_stemmer();
            let stems = stemmer::unique_stems(&line, &stemmer);
            if stems.is_empty() {
                return;
            }

            let key = canonical_key(&stems);
            if memo.lock().mode(partial).contains_key(&key) {
                return;
            }

            // The search runs outside the memo lock.
            let results = index.search(&stems, partial);
            memo.lock().mode_mut(partial).insert(key, results);
        });
    }

    pub fn queries(&self, partial: bool) -> Vec<String> {
        self.memo.lock().mode(partial).keys().cloned().collect()
    }

    pub fn results(&self, query: &str, partial: bool) -> Vec<SearchResult> {
        let stemmer = stemmer::english_stemmer();
        let key = canonical_key(&stemmer::unique_stems(query, &stemmer));
        self.memo
            .lock()
            .mode(partial)
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn num_queries(&self, partial: bool) -> usize {
        self.memo.lock().mode(partial).len()
    }

    pub fn num_results(&self, query: &str, partial: bool) -> usize {
        self.results(query, partial).len()
    }

    pub fn write_results(&self, partial: bool, path: &Path) -> Result<()> {
        let memo = self.memo.lock();
        json::write_results(memo.mode(partial), path)
    }
}

fn io_error(path: &Path, err: std::io::Error) -> Error {
    Error::new(ErrorKind::Io, format!("{}: {}", path.display(), err))
}
