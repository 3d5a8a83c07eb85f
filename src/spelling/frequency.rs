//! Frequency-dictionary spell checker
//!
//! Norvig-style correction: a known word is its own correction; otherwise the
//! most frequent known word one edit away wins, then two edits away.

use crate::error::OcrError;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use super::{read_frequency_file, SpellingSource};

#[derive(Debug, Clone, Default)]
pub struct FrequencySpeller {
    words: HashMap<String, u64>,
    /// Letters used to generate insertions and replacements
    alphabet: BTreeSet<char>,
}

impl FrequencySpeller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a `term count` frequency file.
    pub fn from_file(path: &Path) -> Result<Self, OcrError> {
        let mut speller = Self::new();
        let entries = read_frequency_file(path, 1, 1)?;
        let loaded = entries.len();
        for (term, count) in entries {
            speller.add(term, count);
        }
        tracing::info!("Loaded {} words from {:?}", loaded, path);
        Ok(speller)
    }

    /// Load a frequency file, degrading to an empty dictionary when it is
    /// missing or unreadable.
    pub fn from_file_or_empty(path: &Path) -> Self {
        Self::from_file(path).unwrap_or_else(|e| {
            tracing::warn!("{}; dictionary corrections limited to domain terms", e);
            Self::new()
        })
    }

    fn add(&mut self, term: String, count: u64) {
        self.alphabet.extend(term.chars().filter(|c| c.is_alphabetic()));
        *self.words.entry(term).or_insert(0) += count;
    }

    /// Count each word once more, adding unknown words.
    pub fn load_words<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for word in words {
            self.add(word.as_ref().to_lowercase(), 1);
        }
    }

    pub fn known(&self, word: &str) -> bool {
        self.words.contains_key(word)
    }

    pub fn frequency(&self, word: &str) -> u64 {
        self.words.get(word).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Most likely spelling of `word`, or `None` when nothing within two
    /// edits is known.
    pub fn correction(&self, word: &str) -> Option<String> {
        let word = word.to_lowercase();
        if self.known(&word) {
            return Some(word);
        }

        let one = edits1(&word, &self.alphabet);
        if let Some(best) = self.most_frequent(one.iter().cloned()) {
            return Some(best);
        }

        self.most_frequent(one.iter().flat_map(|e| edits1(e, &self.alphabet)))
    }

    /// Highest frequency known candidate; ties go to the smallest word
    fn most_frequent(&self, candidates: impl Iterator<Item = String>) -> Option<String> {
        candidates
            .filter_map(|c| self.words.get(&c).map(|count| (c, *count)))
            .max_by(|(a, ca), (b, cb)| ca.cmp(cb).then_with(|| b.cmp(a)))
            .map(|(c, _)| c)
    }
}

impl SpellingSource for FrequencySpeller {
    fn name(&self) -> &str {
        "frequency-dictionary"
    }

    fn suggest(&self, word: &str, _previous: Option<&str>) -> Option<String> {
        self.correction(word)
    }
}

/// All strings one delete, transpose, replace or insert away from `word`
fn edits1(word: &str, alphabet: &BTreeSet<char>) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    let mut out = Vec::with_capacity(chars.len() * (2 * alphabet.len() + 2) + alphabet.len());

    for i in 0..=chars.len() {
        let (left, right) = chars.split_at(i);
        let left: String = left.iter().collect();

        if let Some((_, rest)) = right.split_first() {
            out.push(format!("{}{}", left, rest.iter().collect::<String>()));
        }
        if right.len() > 1 {
            out.push(format!(
                "{}{}{}{}",
                left,
                right[1],
                right[0],
                right[2..].iter().collect::<String>()
            ));
        }
        for c in alphabet {
            if let Some((_, rest)) = right.split_first() {
                out.push(format!("{}{}{}", left, c, rest.iter().collect::<String>()));
            }
            out.push(format!("{}{}{}", left, c, right.iter().collect::<String>()));
        }
    }
    out
}
