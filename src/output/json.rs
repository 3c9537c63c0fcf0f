use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::core::error::{Error, ErrorKind, Result};
use crate::index::inverted::SearchResult;

/// One rendered hit. The score is rendered with exactly eight decimal
/// places.
#[derive(Serialize)]
struct ResultEntry<'a> {
    count: usize,
    score: String,
    #[serde(rename = "where")]
    location: &'a str,
}

impl<'a> From<&'a SearchResult> for ResultEntry<'a> {
    fn from(result: &'a SearchResult) -> Self {
        ResultEntry {
            count: result.matches,
            score: format!("{:.8}", result.score),
            location: &result.location,
        }
    }
}

/// Writes the location -> token-count table; keys ascending.
pub fn write_counts(counts: &BTreeMap<String, usize>, path: &Path) -> Result<()> {
    write_pretty(counts, path)
}

/// Writes the word -> location -> positions structure; all keys
/// ascending, positions ascending. Accepts anything that serializes to
/// that shape (the plain and the shared index both do).
pub fn write_index<S: Serialize>(index: &S, path: &Path) -> Result<()> {
    write_pretty(index, path)
}

/// Writes memoized query results: canonical query -> ranked result
/// array, queries ascending.
pub fn write_results(results: &BTreeMap<String, Vec<SearchResult>>, path: &Path) -> Result<()> {
    let rendered: BTreeMap<&str, Vec<ResultEntry<'_>>> = results
        .iter()
        .map(|(query, hits)| (query.as_str(), hits.iter().map(ResultEntry::from).collect()))
        .collect();
    write_pretty(&rendered, path)
}

fn write_pretty<S: Serialize>(value: &S, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|err| io_error(path, err))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n").map_err(|err| io_error(path, err))?;
    writer.flush().map_err(|err| io_error(path, err))?;
    Ok(())
}

fn io_error(path: &Path, err: std::io::Error) -> Error {
    Error::new(ErrorKind::Io, format!("{}: {}", path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::inverted::InvertedIndex;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn counts_render_sorted_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counts.json");
        let counts: BTreeMap<String, usize> =
            [("b.txt".to_string(), 2), ("a.txt".to_string(), 4)]
                .into_iter()
                .collect();

        write_counts(&counts, &path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["a.txt", "b.txt"]);
        assert_eq!(value["a.txt"], 4);
    }

    #[test]
    fn index_renders_nested_positions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");

        let mut index = InvertedIndex::new();
        index.add("fox", "a.txt", 3);
        index.add("fox", "a.txt", 1);

        write_index(&index, &path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["fox"]["a.txt"], serde_json::json!([1, 3]));
    }

    #[test]
    fn results_render_eight_decimal_scores() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");

        let mut index = InvertedIndex::new();
        let words: Vec<String> = ["the", "quick", "brown", "fox"]
            .iter()
            .map(|word| word.to_string())
            .collect();
        index.add_all(&words, "a.txt", 1);

        let stems: BTreeSet<String> =
            ["quick".to_string(), "fox".to_string()].into_iter().collect();
        let hits = index.search(&stems, false);
        let results: BTreeMap<String, Vec<SearchResult>> =
            [("fox quick".to_string(), hits)].into_iter().collect();

        write_results(&results, &path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        let entry = &value["fox quick"][0];
        assert_eq!(entry["count"], 2);
        assert_eq!(entry["score"], "0.50000000");
        assert_eq!(entry["where"], "a.txt");
    }
}
