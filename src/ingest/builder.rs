use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::error;

use crate::analysis::{stemmer, tokenizer};
use crate::core::error::{Error, ErrorKind, Result};
use crate::index::concurrent::SharedIndex;
use crate::index::inverted::InvertedIndex;
use crate::parallel::queue::WorkQueue;

/// Returns true for files the builder ingests: names ending in `.txt` or
/// `.text`, compared case-insensitively.
pub fn is_text_file(path: &Path) -> bool {
    match path.file_name().and_then(|name| name.to_str()) {
        Some(name) => {
            let name = name.to_lowercase();
            name.ends_with(".txt") || name.ends_with(".text")
        }
        None => false,
    }
}

/// Reads one UTF-8 text file into `index`. The location is the textual
/// form of `path`; one position counter advances per parsed token across
/// the whole file in source order, starting at 1.
pub fn build_file(path: &Path, index: &mut InvertedIndex) -> Result<()> {
    let file = File::open(path).map_err(|err| io_error(path, err))?;
    let reader = BufReader::new(file);
    let location = path.display().to_string();
    let stemmer = stemmer::english_stemmer();

    let mut position = 1u32;
    for line in reader.lines() {
        let line = line.map_err(|err| io_error(path, err))?;
        for word in tokenizer::parse(&line) {
            index.add(&stemmer::stem(&word, &stemmer), &location, position);
            position += 1;
        }
    }
    Ok(())
}

/// Indexes a path on the calling thread: directories recurse, text files
/// feed `build_file`, anything else is skipped silently. A path that does
/// not exist is an `InputMissing` error.
pub fn build_path(path: &Path, index: &mut InvertedIndex) -> Result<()> {
    if !path.exists() {
        return Err(missing_input(path));
    }
    if path.is_dir() {
        build_directory(path, index)
    } else if is_text_file(path) {
        build_file(path, index)
    } else {
        Ok(())
    }
}

fn build_directory(path: &Path, index: &mut InvertedIndex) -> Result<()> {
    for entry in fs::read_dir(path).map_err(|err| io_error(path, err))? {
        let child = entry.map_err(|err| io_error(path, err))?.path();
        if child.is_dir() {
            build_directory(&child, index)?;
        } else if is_text_file(&child) {
            build_file(&child, index)?;
        }
    }
    Ok(())
}

/// Multi-threaded build. Traversal stays on the calling thread; each text
/// file becomes a task that fills a fresh local index and publishes it
/// with one merge under the write lock. Returns once every discovered
/// file has been merged.
pub fn build(path: &Path, index: &Arc<SharedIndex>, queue: &WorkQueue) -> Result<()> {
    if !path.exists() {
        return Err(missing_input(path));
    }
    submit_tasks(path, index, queue)?;
    queue.finish();
    Ok(())
}

fn submit_tasks(path: &Path, index: &Arc<SharedIndex>, queue: &WorkQueue) -> Result<()> {
    if path.is_dir() {
        for entry in fs::read_dir(path).map_err(|err| io_error(path, err))? {
            let child = entry.map_err(|err| io_error(path, err))?.path();
            if child.is_dir() {
                submit_tasks(&child, index, queue)?;
            } else if is_text_file(&child) {
                submit_file(child, index, queue);
            }
        }
        Ok(())
    } else if is_text_file(path) {
        submit_file(path.to_path_buf(), index, queue);
        Ok(())
    } else {
        Ok(())
    }
}

fn submit_file(file: PathBuf, index: &Arc<SharedIndex>, queue: &WorkQueue) {
    let index = Arc::clone(index);
    queue.execute(move || {
        let mut local = InvertedIndex::new();
        match build_file(&file, &mut local) {
            Ok(()) => index.merge(local),
            Err(err) => error!("unable to index {}: {}", file.display(), err),
        }
    });
}

fn io_error(path: &Path, err: std::io::Error) -> Error {
    Error::new(ErrorKind::Io, format!("{}: {}", path.display(), err))
}

fn missing_input(path: &Path) -> Error {
    Error::new(
        ErrorKind::InputMissing,
        format!("no such input: {}", path.display()),
    )
}
