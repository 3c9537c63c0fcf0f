use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};

use crate::index::inverted::{InvertedIndex, SearchResult};
use crate::parallel::rwlock::FairRwLock;

/// Thread-safe inverted index. One fair read/write lock guards the whole
/// structure: searches and accessors take the read side, `add`/`merge`
/// the write side. The lock is an internal detail; callers only see the
/// same API as [`InvertedIndex`], returning owned snapshots that stay
/// valid after later writes.
///
/// Builder and crawler tasks keep the write hold short by filling a local
/// [`InvertedIndex`] first and publishing it with a single `merge`.
pub struct SharedIndex {
    inner: FairRwLock<InvertedIndex>,
}

impl SharedIndex {
    pub fn new() -> Self {
        SharedIndex {
            inner: FairRwLock::new(InvertedIndex::new()),
        }
    }

    pub fn add(&self, word: &str, location: &str, position: u32) {
        self.inner.write().add(word, location, position);
    }

    pub fn add_all(&self, words: &[String], location: &str, start: u32) {
        self.inner.write().add_all(words, location, start);
    }

    /// Publishes a local index. Locations in `local` must not already be
    /// present; see [`InvertedIndex::merge`].
    pub fn merge(&self, local: InvertedIndex) {
        self.inner.write().merge(local);
    }

    pub fn contains_word(&self, word: &str) -> bool {
        self.inner.read().contains_word(word)
    }

    pub fn contains_location(&self, word: &str, location: &str) -> bool {
        self.inner.read().contains_location(word, location)
    }

    pub fn contains_position(&self, word: &str, location: &str, position: u32) -> bool {
        self.inner.read().contains_position(word, location, position)
    }

    pub fn contains_count(&self, location: &str) -> bool {
        self.inner.read().contains_count(location)
    }

    pub fn num_words(&self) -> usize {
        self.inner.read().num_words()
    }

    pub fn num_locations(&self, word: &str) -> usize {
        self.inner.read().num_locations(word)
    }

    pub fn num_positions(&self, word: &str, location: &str) -> usize {
        self.inner.read().num_positions(word, location)
    }

    pub fn num_counts(&self) -> usize {
        self.inner.read().num_counts()
    }

    pub fn words(&self) -> Vec<String> {
        self.inner.read().words()
    }

    pub fn locations(&self, word: &str) -> Vec<String> {
        self.inner.read().locations(word)
    }

    pub fn positions(&self, word: &str, location: &str) -> Vec<u32> {
        self.inner.read().positions(word, location)
    }

    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.inner.read().counts()
    }

    pub fn count(&self, location: &str) -> usize {
        self.inner.read().count(location)
    }

    pub fn search(&self, stems: &BTreeSet<String>, partial: bool) -> Vec<SearchResult> {
        self.inner.read().search(stems, partial)
    }
}

impl Default for SharedIndex {
    fn default() -> Self {
        SharedIndex::new()
    }
}

/// Serializes the underlying index under one read acquisition.
impl Serialize for SharedIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.read().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_merges_preserve_counts() {
        let shared = Arc::new(SharedIndex::new());
        let mut handles = Vec::new();

        for file in 0..8 {
            let shared = Arc::clone(&shared);
            handles.push(thread::spawn(move || {
                let location = format!("file-{}.txt", file);
                let mut local = InvertedIndex::new();
                let words: Vec<String> =
                    (0..100).map(|i| format!("word{}", i % 10)).collect();
                local.add_all(&words, &location, 1);
                shared.merge(local);
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.num_counts(), 8);
        for file in 0..8 {
            let location = format!("file-{}.txt", file);
            assert_eq!(shared.count(&location), 100);
            let total: usize = shared
                .words()
                .iter()
                .map(|word| shared.num_positions(word, &location))
                .sum();
            assert_eq!(total, 100);
        }
    }

    #[test]
    fn snapshots_survive_later_writes() {
        let shared = SharedIndex::new();
        shared.add("fox", "a.txt", 1);

        let words = shared.words();
        let positions = shared.positions("fox", "a.txt");
        shared.add("wolf", "a.txt", 2);
        shared.add("fox", "a.txt", 3);

        assert_eq!(words, ["fox"]);
        assert_eq!(positions, [1]);
        assert_eq!(shared.positions("fox", "a.txt"), [1, 3]);
    }

    #[test]
    fn searches_run_against_live_index() {
        let shared = SharedIndex::new();
        let words: Vec<String> = ["quick", "brown", "fox"]
            .iter()
            .map(|word| word.to_string())
            .collect();
        shared.add_all(&words, "a.txt", 1);

        let stems: std::collections::BTreeSet<String> =
            ["quick".to_string(), "fox".to_string()].into_iter().collect();
        let results = shared.search(&stems, false);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matches, 2);
    }
}
