//! Symmetric-delete spelling correction
//!
//! Dictionary words are indexed by every string reachable through up to
//! `max_edit_distance` deletions of their first `prefix_length` characters.
//! A lookup generates the same deletions of the input and only computes real
//! edit distances for the words sharing a delete.

use crate::error::OcrError;
use crate::similarity::edit_distance;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use super::{read_frequency_file, SpellingSource};

pub const DEFAULT_MAX_EDIT_DISTANCE: usize = 2;
pub const DEFAULT_PREFIX_LENGTH: usize = 7;

/// How many suggestions a lookup returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// The single best suggestion
    Top,
    /// All suggestions at the smallest edit distance found
    Closest,
    /// Every suggestion within the maximum edit distance
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub term: String,
    pub distance: usize,
    pub count: u64,
}

#[derive(Debug, Clone)]
pub struct SymSpell {
    max_edit_distance: usize,
    prefix_length: usize,
    words: HashMap<String, u64>,
    deletes: HashMap<String, Vec<String>>,
    bigrams: HashMap<String, u64>,
    max_length: usize,
}

impl Default for SymSpell {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EDIT_DISTANCE, DEFAULT_PREFIX_LENGTH)
    }
}

impl SymSpell {
    pub fn new(max_edit_distance: usize, prefix_length: usize) -> Self {
        Self {
            max_edit_distance,
            prefix_length: prefix_length.max(1),
            words: HashMap::new(),
            deletes: HashMap::new(),
            bigrams: HashMap::new(),
            max_length: 0,
        }
    }

    /// Load a `term count` unigram dictionary. Returns the number of entries.
    pub fn load_dictionary(&mut self, path: &Path) -> Result<usize, OcrError> {
        let entries = read_frequency_file(path, 1, 1)?;
        let loaded = entries.len();
        for (term, count) in entries {
            self.create_entry(&term, count);
        }
        Ok(loaded)
    }

    /// Load a `first second count` bigram dictionary. Returns the number of
    /// entries.
    pub fn load_bigram_dictionary(&mut self, path: &Path) -> Result<usize, OcrError> {
        let entries = read_frequency_file(path, 2, 2)?;
        let loaded = entries.len();
        for (pair, count) in entries {
            *self.bigrams.entry(pair).or_insert(0) += count;
        }
        Ok(loaded)
    }

    /// Add `count` occurrences of `term`, indexing it if new.
    pub fn create_entry(&mut self, term: &str, count: u64) {
        let term = term.to_lowercase();
        if let Some(existing) = self.words.get_mut(&term) {
            *existing = existing.saturating_add(count);
            return;
        }

        self.max_length = self.max_length.max(term.chars().count());
        for delete in self.prefix_deletes(&term) {
            self.deletes.entry(delete).or_default().push(term.clone());
        }
        self.words.insert(term, count);
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn bigram_count(&self, first: &str, second: &str) -> u64 {
        self.bigrams
            .get(&format!("{} {}", first, second))
            .copied()
            .unwrap_or(0)
    }

    /// Suggestions for `input` within `max_edit_distance`, sorted by distance
    /// then descending count. An unknown word with no suggestion yields an
    /// empty list.
    pub fn lookup(&self, input: &str, verbosity: Verbosity, max_edit_distance: usize) -> Vec<Suggestion> {
        let max_edit_distance = max_edit_distance.min(self.max_edit_distance);
        let input = input.to_lowercase();
        let input_chars: Vec<char> = input.chars().collect();
        let input_len = input_chars.len();
        let mut suggestions: Vec<Suggestion> = Vec::new();

        if input_len.saturating_sub(max_edit_distance) > self.max_length {
            return suggestions;
        }

        if let Some(&count) = self.words.get(&input) {
            suggestions.push(Suggestion {
                term: input.clone(),
                distance: 0,
                count,
            });
            if verbosity != Verbosity::All {
                return suggestions;
            }
        }
        if max_edit_distance == 0 {
            return suggestions;
        }

        let mut considered_deletes: HashSet<String> = HashSet::new();
        let mut considered_suggestions: HashSet<String> = HashSet::new();
        considered_suggestions.insert(input.clone());

        let mut current_max = max_edit_distance;
        let input_prefix_len = input_len.min(self.prefix_length);
        let input_prefix: String = input_chars[..input_prefix_len].iter().collect();

        let mut candidates: VecDeque<String> = VecDeque::new();
        candidates.push_back(input_prefix);

        while let Some(candidate) = candidates.pop_front() {
            let candidate_len = candidate.chars().count();
            let len_diff = input_prefix_len - candidate_len;

            // Candidates are generated in order of increasing deletions
            if len_diff > current_max {
                if verbosity == Verbosity::All {
                    continue;
                }
                break;
            }

            if let Some(dict_suggestions) = self.deletes.get(&candidate) {
                for suggestion in dict_suggestions {
                    if *suggestion == input {
                        continue;
                    }
                    let suggestion_len = suggestion.chars().count();
                    if suggestion_len.abs_diff(input_len) > current_max
                        || suggestion_len < candidate_len
                        || (suggestion_len == candidate_len && *suggestion != candidate)
                    {
                        continue;
                    }
                    let suggestion_prefix_len = suggestion_len.min(self.prefix_length);
                    if suggestion_prefix_len > input_prefix_len
                        && suggestion_prefix_len - candidate_len > current_max
                    {
                        continue;
                    }
                    if !considered_suggestions.insert(suggestion.clone()) {
                        continue;
                    }

                    let distance = edit_distance(&input, suggestion);
                    if distance > current_max {
                        continue;
                    }

                    let count = self.words.get(suggestion).copied().unwrap_or(0);
                    let item = Suggestion {
                        term: suggestion.clone(),
                        distance,
                        count,
                    };

                    if !suggestions.is_empty() {
                        match verbosity {
                            Verbosity::Closest if distance < current_max => suggestions.clear(),
                            Verbosity::Top => {
                                if distance < current_max || count > suggestions[0].count {
                                    current_max = distance;
                                    suggestions[0] = item;
                                }
                                continue;
                            }
                            _ => {}
                        }
                    }
                    if verbosity != Verbosity::All {
                        current_max = distance;
                    }
                    suggestions.push(item);
                }
            }

            // Deeper deletes of the candidate
            if len_diff < max_edit_distance && candidate_len <= self.prefix_length {
                if verbosity != Verbosity::All && len_diff >= current_max {
                    continue;
                }
                let chars: Vec<char> = candidate.chars().collect();
                for i in 0..chars.len() {
                    let delete: String = chars[..i].iter().chain(&chars[i + 1..]).collect();
                    if considered_deletes.insert(delete.clone()) {
                        candidates.push_back(delete);
                    }
                }
            }
        }

        suggestions.sort_by(|a, b| a.distance.cmp(&b.distance).then(b.count.cmp(&a.count)));
        suggestions
    }

    /// Deletes of the word's prefix used as index keys, including the prefix
    fn prefix_deletes(&self, term: &str) -> HashSet<String> {
        let mut keys = HashSet::new();
        let chars: Vec<char> = term.chars().collect();
        if chars.len() <= self.max_edit_distance {
            keys.insert(String::new());
        }
        let prefix: String = chars.iter().take(self.prefix_length).collect();
        keys.insert(prefix.clone());
        self.deletes_of(&prefix, 0, &mut keys);
        keys
    }

    fn deletes_of(&self, word: &str, distance: usize, keys: &mut HashSet<String>) {
        let distance = distance + 1;
        let chars: Vec<char> = word.chars().collect();
        if chars.len() <= 1 {
            return;
        }
        for i in 0..chars.len() {
            let delete: String = chars[..i].iter().chain(&chars[i + 1..]).collect();
            if keys.insert(delete.clone()) && distance < self.max_edit_distance {
                self.deletes_of(&delete, distance, keys);
            }
        }
    }
}

/// Edit-distance correction source: closest dictionary term within the
/// maximum edit distance, with bigram context breaking ties.
#[derive(Debug, Clone, Default)]
pub struct SymSpellSource {
    symspell: SymSpell,
}

impl SymSpellSource {
    pub fn new(symspell: SymSpell) -> Self {
        Self { symspell }
    }

    /// Load unigram and bigram dictionaries. A dictionary that cannot be
    /// loaded is reported once and left empty.
    pub fn from_files(frequency_path: &Path, bigram_path: &Path) -> Self {
        let mut symspell = SymSpell::default();
        match symspell.load_dictionary(frequency_path) {
            Ok(n) => tracing::info!("Loaded {} SymSpell terms from {:?}", n, frequency_path),
            Err(e) => tracing::error!("{}; edit-distance corrections unavailable", e),
        }
        match symspell.load_bigram_dictionary(bigram_path) {
            Ok(n) => tracing::info!("Loaded {} SymSpell bigrams from {:?}", n, bigram_path),
            Err(e) => tracing::error!("{}; bigram context unavailable", e),
        }
        Self { symspell }
    }

    pub fn symspell(&self) -> &SymSpell {
        &self.symspell
    }
}

impl SpellingSource for SymSpellSource {
    fn name(&self) -> &str {
        "symspell"
    }

    fn suggest(&self, word: &str, previous: Option<&str>) -> Option<String> {
        let suggestions = self
            .symspell
            .lookup(word, Verbosity::Closest, DEFAULT_MAX_EDIT_DISTANCE);

        let best = match previous {
            Some(prev) if suggestions.len() > 1 => suggestions.iter().max_by(|a, b| {
                let context = self
                    .symspell
                    .bigram_count(prev, &a.term)
                    .cmp(&self.symspell.bigram_count(prev, &b.term));
                // Full ties go to the alphabetically first term
                context.then(a.count.cmp(&b.count)).then(b.term.cmp(&a.term))
            }),
            _ => suggestions.first(),
        };
        best.map(|s| s.term.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn dictionary() -> SymSpell {
        let mut symspell = SymSpell::default();
        for (term, count) in [
            ("the", 23135851162),
            ("cat", 50000),
            ("hat", 40000),
            ("sat", 60000),
            ("pressure", 9000),
            ("reservoir", 3000),
            ("a", 9000000),
        ] {
            symspell.create_entry(term, count);
        }
        symspell
    }

    #[test]
    fn test_exact_match_short_circuits() {
        let result = dictionary().lookup("cat", Verbosity::Closest, 2);
        assert_eq!(
            result,
            vec![Suggestion {
                term: "cat".to_string(),
                distance: 0,
                count: 50000
            }]
        );
    }

    #[test]
    fn test_closest_returns_only_smallest_distance() {
        // "xat" is one substitution from cat, hat and sat
        let result = dictionary().lookup("xat", Verbosity::Closest, 2);
        let terms: Vec<_> = result.iter().map(|s| s.term.as_str()).collect();
        assert_eq!(terms, vec!["sat", "cat", "hat"]);
        assert!(result.iter().all(|s| s.distance == 1));
    }

    #[test]
    fn test_transposition_counts_as_one_edit() {
        let result = dictionary().lookup("teh", Verbosity::Closest, 2);
        assert_eq!(result[0].term, "the");
        assert_eq!(result[0].distance, 1);
    }

    #[test]
    fn test_two_edits_in_long_word() {
        let result = dictionary().lookup("resrvior", Verbosity::Closest, 2);
        assert_eq!(result[0].term, "reservoir");
        assert_eq!(result[0].distance, 2);
    }

    #[test]
    fn test_beyond_max_distance_is_empty() {
        assert!(dictionary().lookup("zzzzzz", Verbosity::Closest, 2).is_empty());
    }

    #[test]
    fn test_top_returns_single_suggestion() {
        let result = dictionary().lookup("xat", Verbosity::Top, 2);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].term, "sat");
    }

    #[test]
    fn test_all_includes_farther_suggestions() {
        let result = dictionary().lookup("cxt", Verbosity::All, 2);
        let terms: Vec<_> = result.iter().map(|s| s.term.as_str()).collect();
        assert_eq!(terms[0], "cat");
        assert!(terms.contains(&"sat"));
        assert!(terms.contains(&"hat"));
    }

    #[test]
    fn test_source_uses_bigram_context() {
        let mut symspell = dictionary();
        let mut bigrams = tempfile::NamedTempFile::new().unwrap();
        writeln!(bigrams, "the hat 500\nthe cat 100").unwrap();
        symspell.load_bigram_dictionary(bigrams.path()).unwrap();
        let source = SymSpellSource::new(symspell);

        assert_eq!(source.suggest("xat", None), Some("sat".to_string()));
        assert_eq!(source.suggest("xat", Some("the")), Some("hat".to_string()));
        assert_eq!(source.suggest("xat", Some("unrelated")), Some("sat".to_string()));
    }

    #[test]
    fn test_source_full_tie_prefers_alphabetically_first() {
        let mut symspell = SymSpell::default();
        symspell.create_entry("rat", 100);
        symspell.create_entry("bat", 100);
        let source = SymSpellSource::new(symspell);
        assert_eq!(source.suggest("xat", Some("the")), Some("bat".to_string()));
    }

    #[test]
    fn test_source_with_missing_dictionaries_suggests_nothing() {
        let source = SymSpellSource::from_files(
            Path::new("/nonexistent/freq.txt"),
            Path::new("/nonexistent/bigram.txt"),
        );
        assert_eq!(source.suggest("teh", None), None);
    }
}
