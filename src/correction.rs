//! Text correction engine
//!
//! Repairs raw OCR text word by word. Domain terms are never touched; other
//! alphabetic words are offered to the backend's spelling source and the
//! accepted suggestion takes on the original word's capitalization. Text is
//! split losslessly so everything that is not corrected survives byte for
//! byte, then the whole string gets one grammar pass.

use crate::grammar::GrammarTool;
use crate::spelling::SpellingSource;
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

/// Hyphenated words, words, punctuation runs and whitespace runs;
/// concatenating every match reproduces the input
static SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\w+(?:-\w+)+|\w+|[^\w\s]+|\s+").expect("valid segment regex")
});

/// Pieces of a hyphenated word that is not a domain term
static PIECE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+|\W+").expect("valid piece regex"));

pub struct TextCorrector {
    domain_terms: Arc<HashSet<String>>,
    source: Arc<dyn SpellingSource>,
    grammar: Arc<dyn GrammarTool>,
    /// Words shorter than this are left alone
    min_word_len: usize,
}

impl TextCorrector {
    pub fn new(
        domain_terms: Arc<HashSet<String>>,
        source: Arc<dyn SpellingSource>,
        grammar: Arc<dyn GrammarTool>,
        min_word_len: usize,
    ) -> Self {
        Self {
            domain_terms,
            source,
            grammar,
            min_word_len,
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Spelling pass only, without grammar
    pub fn correct_spelling(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        let mut previous: Option<String> = None;

        for segment in SEGMENT_RE.find_iter(raw).map(|m| m.as_str()) {
            if !is_word(segment) {
                out.push_str(segment);
                continue;
            }

            // A hyphenated domain term is kept whole; otherwise each part is a word
            if segment.contains('-') && !self.domain_terms.contains(&segment.to_lowercase()) {
                for piece in PIECE_RE.find_iter(segment).map(|m| m.as_str()) {
                    if is_word(piece) {
                        self.push_word(piece, &mut previous, &mut out);
                    } else {
                        out.push_str(piece);
                    }
                }
            } else {
                self.push_word(segment, &mut previous, &mut out);
            }
        }
        out
    }

    fn push_word(&self, word: &str, previous: &mut Option<String>, out: &mut String) {
        let corrected = self.correct_word(word, previous.as_deref());
        *previous = Some(corrected.to_lowercase());
        out.push_str(&corrected);
    }

    /// Spelling pass followed by a grammar pass. When the grammar tool fails
    /// the spelling-corrected text is returned.
    pub fn correct(&self, raw: &str) -> String {
        let spelled = self.correct_spelling(raw);
        match self.grammar.correct(&spelled) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Grammar correction failed, keeping spelling corrections: {}", e);
                spelled
            }
        }
    }

    fn correct_word(&self, word: &str, previous: Option<&str>) -> String {
        let lower = word.to_lowercase();
        if self.domain_terms.contains(&lower) {
            return word.to_string();
        }
        if !lower.chars().all(char::is_alphabetic) || lower.chars().count() < self.min_word_len {
            return word.to_string();
        }

        match self.source.suggest(&lower, previous) {
            Some(suggestion) if suggestion != lower => {
                tracing::trace!("{}: {} -> {}", self.source.name(), word, suggestion);
                apply_case(word, &suggestion)
            }
            _ => word.to_string(),
        }
    }
}

fn is_word(segment: &str) -> bool {
    segment.chars().next().is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Give `suggestion` the capitalization pattern of `original`
pub fn apply_case(original: &str, suggestion: &str) -> String {
    let first_upper = original.chars().next().is_some_and(char::is_uppercase);
    let has_cased = original.chars().any(|c| c.is_alphabetic());
    let all_upper = has_cased && !original.chars().any(char::is_lowercase);

    if all_upper && original.chars().count() > 1 {
        suggestion.to_uppercase()
    } else if first_upper && !all_upper {
        capitalize(suggestion)
    } else {
        suggestion.to_string()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
