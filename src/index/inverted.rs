use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

use serde::{Serialize, Serializer};

/// Inverted index mapping stemmed words to the locations and 1-based
/// positions where they occur, alongside a per-location token count used
/// as the score denominator.
///
/// Both map levels stay in ascending key order; the prefix scan in
/// `partial_search` depends on it. The structure is not synchronized.
/// Builder tasks fill private instances and hand them to
/// [`SharedIndex::merge`](crate::index::concurrent::SharedIndex::merge)
/// for publication.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    /// word -> location -> ascending positions
    index: BTreeMap<String, BTreeMap<String, BTreeSet<u32>>>,
    /// location -> total stems recorded at that location
    counts: BTreeMap<String, usize>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        InvertedIndex::default()
    }

    /// Records one word occurrence. Idempotent per (word, location,
    /// position): only the first observation bumps the location count.
    pub fn add(&mut self, word: &str, location: &str, position: u32) {
        let positions = self
            .index
            .entry(word.to_string())
            .or_default()
            .entry(location.to_string())
            .or_default();
        if positions.insert(position) {
            *self.counts.entry(location.to_string()).or_insert(0) += 1;
        }
    }

    /// Records a run of words at consecutive positions beginning at
    /// `start`.
    pub fn add_all(&mut self, words: &[String], location: &str, start: u32) {
        let mut position = start;
        for word in words {
            self.add(word, location, position);
            position += 1;
        }
    }

    /// Absorbs every entry of `other`. The caller guarantees that `other`
    /// holds no location already present here (each file and each crawled
    /// page is indexed exactly once), which lets the counts be added
    /// without re-deriving them from position sets.
    pub fn merge(&mut self, other: InvertedIndex) {
        debug_assert!(
            other
                .counts
                .keys()
                .all(|location| !self.counts.contains_key(location)),
            "merge requires disjoint locations"
        );

        for (word, locations) in other.index {
            match self.index.entry(word) {
                Entry::Vacant(entry) => {
                    entry.insert(locations);
                }
                Entry::Occupied(mut entry) => {
                    let known = entry.get_mut();
                    for (location, positions) in locations {
                        match known.entry(location) {
                            Entry::Vacant(entry) => {
                                entry.insert(positions);
                            }
                            Entry::Occupied(mut entry) => {
                                entry.get_mut().extend(positions);
                            }
                        }
                    }
                }
            }
        }

        for (location, count) in other.counts {
            *self.counts.entry(location).or_insert(0) += count;
        }
    }

    pub fn contains_word(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    pub fn contains_location(&self, word: &str, location: &str) -> bool {
        self.index
            .get(word)
            .is_some_and(|locations| locations.contains_key(location))
    }

    pub fn contains_position(&self, word: &str, location: &str, position: u32) -> bool {
        self.index
            .get(word)
            .and_then(|locations| locations.get(location))
            .is_some_and(|positions| positions.contains(&position))
    }

    pub fn contains_count(&self, location: &str) -> bool {
        self.counts.contains_key(location)
    }

    pub fn num_words(&self) -> usize {
        self.index.len()
    }

    pub fn num_locations(&self, word: &str) -> usize {
        self.index.get(word).map_or(0, BTreeMap::len)
    }

    pub fn num_positions(&self, word: &str, location: &str) -> usize {
        self.index
            .get(word)
            .and_then(|locations| locations.get(location))
            .map_or(0, BTreeSet::len)
    }

    pub fn num_counts(&self) -> usize {
        self.counts.len()
    }

    /// All indexed words in ascending order.
    pub fn words(&self) -> Vec<String> {
        self.index.keys().cloned().collect()
    }

    /// Locations containing `word`, ascending; empty if the word is
    /// unknown.
    pub fn locations(&self, word: &str) -> Vec<String> {
        self.index
            .get(word)
            .map(|locations| locations.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Positions of `word` at `location`, ascending; empty if absent.
    pub fn positions(&self, word: &str, location: &str) -> Vec<u32> {
        self.index
            .get(word)
            .and_then(|locations| locations.get(location))
            .map(|positions| positions.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the word-count table, keys ascending.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.counts.clone()
    }

    pub fn count(&self, location: &str) -> usize {
        self.counts.get(location).copied().unwrap_or(0)
    }

    /// Runs an exact or prefix search over a deduplicated stem set and
    /// returns ranked results.
    pub fn search(&self, stems: &BTreeSet<String>, partial: bool) -> Vec<SearchResult> {
        if partial {
            self.partial_search(stems)
        } else {
            self.exact_search(stems)
        }
    }

    /// Matches query stems to index words by equality.
    pub fn exact_search(&self, stems: &BTreeSet<String>) -> Vec<SearchResult> {
        let mut lookup = HashMap::new();
        let mut results = Vec::new();

        for stem in stems {
            if let Some(locations) = self.index.get(stem) {
                self.collect_matches(locations, &mut lookup, &mut results);
            }
        }

        results.sort();
        results
    }

    /// Matches query stems as prefixes of index words. Each stem scans the
    /// tail range of the word map starting at itself and stops at the
    /// first word that no longer shares the prefix.
    pub fn partial_search(&self, stems: &BTreeSet<String>) -> Vec<SearchResult> {
        let mut lookup = HashMap::new();
        let mut results = Vec::new();

        for stem in stems {
            let tail = (Bound::Included(stem.as_str()), Bound::Unbounded);
            for (word, locations) in self.index.range::<str, _>(tail) {
                if !word.starts_with(stem.as_str()) {
                    break;
                }
                self.collect_matches(locations, &mut lookup, &mut results);
            }
        }

        results.sort();
        results
    }

    /// Folds one word's postings into the accumulating results, creating a
    /// result the first time a location appears and rescoring on every
    /// update.
    fn collect_matches(
        &self,
        locations: &BTreeMap<String, BTreeSet<u32>>,
        lookup: &mut HashMap<String, usize>,
        results: &mut Vec<SearchResult>,
    ) {
        for (location, positions) in locations {
            let slot = match lookup.get(location) {
                Some(&slot) => slot,
                None => {
                    lookup.insert(location.clone(), results.len());
                    results.push(SearchResult::new(location.clone()));
                    results.len() - 1
                }
            };

            let result = &mut results[slot];
            result.matches += positions.len();
            // Every matched location has a count; see the add/merge paths.
            result.score = result.matches as f64 / self.counts[location] as f64;
        }
    }
}

/// Serializes as the word -> location -> positions mapping, all keys
/// ascending, positions ascending.
impl Serialize for InvertedIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.index.serialize(serializer)
    }
}

/// One ranked hit: a location with its accumulated match count and the
/// score `matches / counts[location]`, a value in (0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub location: String,
    pub matches: usize,
    pub score: f64,
}

impl SearchResult {
    fn new(location: String) -> Self {
        SearchResult {
            location,
            matches: 0,
            score: 0.0,
        }
    }
}

impl Eq for SearchResult {}

impl PartialOrd for SearchResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ranking order: score descending, then matches descending, then
/// location ascending ignoring case, with a case-sensitive location
/// comparison last so the order is total and deterministic.
impl Ord for SearchResult {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.matches.cmp(&self.matches))
            .then_with(|| {
                self.location
                    .to_lowercase()
                    .cmp(&other.location.to_lowercase())
            })
            .then_with(|| self.location.cmp(&other.location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stems(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|word| word.to_string()).collect()
    }

    fn add_text(index: &mut InvertedIndex, location: &str, words: &[&str]) {
        let words: Vec<String> = words.iter().map(|word| word.to_string()).collect();
        index.add_all(&words, location, 1);
    }

    #[test]
    fn add_tracks_counts_per_distinct_position() {
        let mut index = InvertedIndex::new();
        index.add("fox", "a.txt", 1);
        index.add("fox", "a.txt", 2);
        index.add("fox", "a.txt", 2);

        assert_eq!(index.count("a.txt"), 2);
        assert_eq!(index.positions("fox", "a.txt"), [1, 2]);
        assert_eq!(index.num_positions("fox", "a.txt"), 2);
    }

    #[test]
    fn counts_equal_sum_of_position_sets() {
        let mut index = InvertedIndex::new();
        add_text(&mut index, "a.txt", &["the", "quick", "brown", "fox", "the"]);

        let total: usize = index
            .words()
            .iter()
            .map(|word| index.num_positions(word, "a.txt"))
            .sum();
        assert_eq!(index.count("a.txt"), total);
        assert_eq!(index.count("a.txt"), 5);
    }

    #[test]
    fn accessors_on_missing_entries() {
        let index = InvertedIndex::new();
        assert!(!index.contains_word("fox"));
        assert!(!index.contains_location("fox", "a.txt"));
        assert!(!index.contains_position("fox", "a.txt", 1));
        assert!(!index.contains_count("a.txt"));
        assert_eq!(index.num_words(), 0);
        assert_eq!(index.num_locations("fox"), 0);
        assert_eq!(index.count("a.txt"), 0);
        assert!(index.words().is_empty());
        assert!(index.positions("fox", "a.txt").is_empty());
    }

    #[test]
    fn words_and_locations_are_sorted() {
        let mut index = InvertedIndex::new();
        index.add("zebra", "b.txt", 1);
        index.add("apple", "b.txt", 2);
        index.add("apple", "a.txt", 1);

        assert_eq!(index.words(), ["apple", "zebra"]);
        assert_eq!(index.locations("apple"), ["a.txt", "b.txt"]);
    }

    #[test]
    fn merge_unions_disjoint_locations() {
        let mut shared = InvertedIndex::new();
        add_text(&mut shared, "a.txt", &["quick", "fox"]);

        let mut local = InvertedIndex::new();
        add_text(&mut local, "b.txt", &["quick", "dog"]);

        shared.merge(local);

        assert_eq!(shared.locations("quick"), ["a.txt", "b.txt"]);
        assert_eq!(shared.count("a.txt"), 2);
        assert_eq!(shared.count("b.txt"), 2);
        assert_eq!(shared.num_counts(), 2);
    }

    #[test]
    fn merge_into_fresh_index_is_equivalent() {
        let build = || {
            let mut local = InvertedIndex::new();
            add_text(&mut local, "b.txt", &["quick", "brown", "dog"]);
            local
        };

        let mut merged = InvertedIndex::new();
        merged.merge(build());
        let direct = build();

        assert_eq!(merged.words(), direct.words());
        assert_eq!(merged.counts(), direct.counts());
        for word in merged.words() {
            assert_eq!(
                merged.positions(&word, "b.txt"),
                direct.positions(&word, "b.txt")
            );
        }
    }

    #[test]
    fn exact_search_single_file() {
        let mut index = InvertedIndex::new();
        add_text(&mut index, "a.txt", &["the", "quick", "brown", "fox"]);

        let results = index.search(&stems(&["quick", "fox"]), false);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].location, "a.txt");
        assert_eq!(results[0].matches, 2);
        assert!((results[0].score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn exact_search_unknown_stem_is_skipped() {
        let mut index = InvertedIndex::new();
        add_text(&mut index, "a.txt", &["quick"]);

        let results = index.search(&stems(&["quick", "missing"]), false);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matches, 1);
    }

    #[test]
    fn empty_stem_set_returns_nothing() {
        let mut index = InvertedIndex::new();
        add_text(&mut index, "a.txt", &["quick"]);
        assert!(index.search(&BTreeSet::new(), false).is_empty());
        assert!(index.search(&BTreeSet::new(), true).is_empty());
    }

    #[test]
    fn ranking_prefers_higher_score() {
        let mut index = InvertedIndex::new();
        // a.txt: 2 of 10 tokens match (0.2); b.txt: 3 of 100 (0.03).
        add_text(
            &mut index,
            "a.txt",
            &["hit", "hit", "x1", "x2", "x3", "x4", "x5", "x6", "x7", "x8"],
        );
        let filler: Vec<String> = (0..97).map(|i| format!("w{}", i)).collect();
        let mut b_words: Vec<String> = vec!["hit".into(), "hit".into(), "hit".into()];
        b_words.extend(filler);
        index.add_all(&b_words, "b.txt", 1);

        let results = index.search(&stems(&["hit"]), false);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].location, "a.txt");
        assert_eq!(results[1].location, "b.txt");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn ranking_breaks_score_tie_by_matches() {
        let mut index = InvertedIndex::new();
        // Same score 0.5; x.txt has more absolute matches.
        add_text(&mut index, "x.txt", &["hit", "hit", "miss", "miss"]);
        add_text(&mut index, "y.txt", &["hit", "miss"]);

        let results = index.search(&stems(&["hit"]), false);
        assert_eq!(results[0].location, "x.txt");
        assert_eq!(results[0].matches, 2);
        assert_eq!(results[1].location, "y.txt");
        assert_eq!(results[1].matches, 1);
    }

    #[test]
    fn ranking_breaks_full_tie_by_location() {
        let mut index = InvertedIndex::new();
        add_text(&mut index, "y.txt", &["hit", "miss"]);
        add_text(&mut index, "X.txt", &["hit", "miss"]);

        let results = index.search(&stems(&["hit"]), false);
        // Case-insensitive ascending: "X.txt" before "y.txt".
        assert_eq!(results[0].location, "X.txt");
        assert_eq!(results[1].location, "y.txt");
    }

    #[test]
    fn partial_search_combines_prefixed_words() {
        let mut index = InvertedIndex::new();
        add_text(&mut index, "a.txt", &["cat", "catalog", "dog"]);

        let results = index.search(&stems(&["cat"]), true);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matches, 2);

        let exact = index.search(&stems(&["cat"]), false);
        assert_eq!(exact[0].matches, 1);
    }

    #[test]
    fn partial_search_stops_at_prefix_boundary() {
        let mut index = InvertedIndex::new();
        add_text(&mut index, "a.txt", &["car", "cart", "cast", "dog"]);

        let results = index.search(&stems(&["car"]), true);
        // "cast" and "dog" fall outside the prefix range.
        assert_eq!(results[0].matches, 2);
    }

    #[test]
    fn exact_results_are_subset_of_partial() {
        let mut index = InvertedIndex::new();
        add_text(&mut index, "a.txt", &["cat", "catalog"]);
        add_text(&mut index, "b.txt", &["category", "dog"]);

        let query = stems(&["cat", "dog"]);
        let exact = index.search(&query, false);
        let partial = index.search(&query, true);

        for hit in &exact {
            let shadow = partial
                .iter()
                .find(|candidate| candidate.location == hit.location)
                .expect("every exact hit appears in partial results");
            assert!(shadow.matches >= hit.matches);
        }
    }

    #[test]
    fn search_is_deterministic() {
        let mut index = InvertedIndex::new();
        add_text(&mut index, "a.txt", &["alpha", "beta", "gamma"]);
        add_text(&mut index, "b.txt", &["alpha", "beta", "delta"]);
        add_text(&mut index, "c.txt", &["alpha", "epsilon", "zeta"]);

        let query = stems(&["alpha", "beta"]);
        let first = index.search(&query, true);
        let second = index.search(&query, true);
        assert_eq!(first, second);
    }
}
