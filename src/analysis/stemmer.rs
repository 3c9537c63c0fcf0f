use std::collections::BTreeSet;

use rust_stemmers::{Algorithm, Stemmer};

use crate::analysis::tokenizer;

/// Creates a Snowball English stemmer. Stemmer instances are cheap and not
/// shared across threads; each worker constructs its own on task entry.
pub fn english_stemmer() -> Stemmer {
    Stemmer::create(Algorithm::English)
}

pub fn stem(word: &str, stemmer: &Stemmer) -> String {
    stemmer.stem(word).to_string()
}

/// Parses `line`, stems every token, and deduplicates the stems into an
/// ascending ordered set. Stems are already lowercase, so lexicographic
/// order here is case-insensitive order.
pub fn unique_stems(line: &str, stemmer: &Stemmer) -> BTreeSet<String> {
    tokenizer::parse(line)
        .iter()
        .map(|word| stem(word, stemmer))
        .collect()
}
