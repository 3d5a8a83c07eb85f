//! Spelling correction sources
//!
//! A source proposes a replacement for one lowercase word. The text
//! correction engine decides which words to ask about and how to re-case the
//! answer.

pub mod frequency;
pub mod symspell;

use crate::error::OcrError;
use std::path::Path;

pub use frequency::FrequencySpeller;
pub use symspell::{SymSpell, SymSpellSource, Verbosity};

/// A correction source consulted word by word
pub trait SpellingSource: Send + Sync {
    /// Identifier used in logs
    fn name(&self) -> &str;

    /// Best replacement for the lowercase `word`, or `None` when the source
    /// has nothing better. `previous` is the preceding word, lowercase.
    fn suggest(&self, word: &str, previous: Option<&str>) -> Option<String>;
}

/// Read a whitespace-separated frequency file.
///
/// `term_columns` consecutive columns starting at 0 form the term (joined by a
/// single space) and `count_index` holds the count. Lines that do not parse
/// are skipped.
pub fn read_frequency_file(
    path: &Path,
    term_columns: usize,
    count_index: usize,
) -> Result<Vec<(String, u64)>, OcrError> {
    let raw = std::fs::read_to_string(path).map_err(|e| OcrError::dictionary(path, e))?;

    let entries: Vec<(String, u64)> = raw
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() <= count_index.max(term_columns.saturating_sub(1)) {
                return None;
            }
            let count = parts[count_index].parse::<u64>().ok()?;
            let term = parts[..term_columns].join(" ").to_lowercase();
            Some((term, count))
        })
        .collect();

    if entries.is_empty() {
        return Err(OcrError::dictionary(path, "no entries"));
    }
    Ok(entries)
}
