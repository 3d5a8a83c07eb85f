//! Domain post-processing for structured notation
//!
//! Mines formula-like tokens (`H2O`, `NaCl`, `CO2 + H2O = H2CO3`) from a
//! labeled corpus and snaps near-miss OCR words onto them.

use crate::similarity::fuzzy_ratio;
use crate::vocabulary::load_labeled_corpus;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

/// Minimum similarity (exclusive) for a word to be replaced by a pattern.
pub const MATCH_THRESHOLD: f64 = 85.0;

/// Equation-like substrings first, then runs of element-like tokens.
static FORMULA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[A-Z][a-z]?\d*)+\s*[+\-→=].+|(?:[A-Z][a-z]?\d*)+").expect("valid formula regex")
});

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid word regex"));

/// Mined patterns per domain, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct DomainPatterns {
    patterns: BTreeMap<String, Vec<String>>,
}

impl DomainPatterns {
    /// Mine patterns from `(label, text)` pairs.
    pub fn build<L, T>(corpora: impl IntoIterator<Item = (L, T)>) -> Self
    where
        L: AsRef<str>,
        T: AsRef<str>,
    {
        let mut patterns: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (label, text) in corpora {
            let label = label.as_ref();
            let text = text.as_ref();
            if label.is_empty() || text.is_empty() {
                continue;
            }
            let list = patterns.entry(label.to_string()).or_default();
            for m in FORMULA_RE.find_iter(text) {
                let candidate = m.as_str().trim();
                if candidate.chars().count() > 1 && !list.iter().any(|p| p == candidate) {
                    list.push(candidate.to_string());
                }
            }
        }
        patterns.retain(|_, list| !list.is_empty());
        Self { patterns }
    }

    /// Mine patterns from a labeled JSON corpus.
    ///
    /// A missing or malformed corpus is logged and yields no patterns.
    pub fn from_labeled_corpus(path: &Path) -> Self {
        match load_labeled_corpus(path) {
            Ok(entries) => {
                let patterns = Self::build(entries);
                tracing::info!(
                    "Mined domain patterns for {} domains from {:?}",
                    patterns.patterns.len(),
                    path
                );
                patterns
            }
            Err(e) => {
                tracing::error!("{}; domain patterns unavailable", e);
                Self::default()
            }
        }
    }

    pub fn patterns(&self, domain: &str) -> Option<&[String]> {
        self.patterns.get(domain).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Replace each word of `text` with the first pattern of `domain` whose
    /// similarity exceeds the threshold.
    ///
    /// Delimiters between words are kept exactly and the result is trimmed.
    /// A domain without patterns only trims.
    pub fn correct(&self, text: &str, domain: &str) -> String {
        let Some(patterns) = self.patterns.get(domain) else {
            return text.trim().to_string();
        };

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for m in WORD_RE.find_iter(text) {
            out.push_str(&text[last..m.start()]);
            let word = m.as_str();
            match patterns.iter().find(|p| fuzzy_ratio(word, p) > MATCH_THRESHOLD) {
                Some(pattern) => out.push_str(pattern),
                None => out.push_str(word),
            }
            last = m.end();
        }
        out.push_str(&text[last..]);

        out.trim().to_string()
    }
}
