//! Domain vocabulary store and confidence scoring
//!
//! A `DomainVocabulary` maps a domain label to the set of lowercase terms
//! (longer than two characters) seen in that domain's corpora. It is built
//! once with a `VocabularyBuilder` and shared read-only afterwards.

use crate::error::OcrError;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

/// Term tokens: word characters and hyphens.
static TERM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[\w-]+\b").expect("valid term regex"));

/// Plain word tokens used for scoring.
static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w+\b").expect("valid word regex"));

/// Text columns read from free-text corpus records when none are configured.
pub const DEFAULT_TEXT_COLUMNS: &[&str] = &[
    "text",
    "question",
    "answer",
    "passage",
    "context",
    "abstract",
    "description",
    "solution",
    "choices",
    "statement",
    "sentence1",
    "sentence2",
    "title",
    "problem",
    "question_stem",
    "fact1",
    "long_answer",
    "support",
    "distractor1",
    "distractor2",
    "distractor3",
    "correct_answer",
];

/// Keys searched inside object-valued columns.
const NESTED_TEXT_KEYS: &[&str] = &["text", "question", "context", "answer_text"];

/// Immutable mapping from domain label to its known terms.
#[derive(Debug, Clone, Default)]
pub struct DomainVocabulary {
    domains: BTreeMap<String, HashSet<String>>,
}

impl DomainVocabulary {
    /// Build a vocabulary from `(label, text)` pairs.
    pub fn build<L, T>(corpora: impl IntoIterator<Item = (L, T)>) -> Self
    where
        L: AsRef<str>,
        T: AsRef<str>,
    {
        let mut builder = VocabularyBuilder::new();
        for (label, text) in corpora {
            builder.add_text(label.as_ref(), text.as_ref());
        }
        builder.build()
    }

    /// Terms of one domain. Unknown domains are simply absent.
    pub fn terms(&self, domain: &str) -> Option<&HashSet<String>> {
        self.domains.get(domain)
    }

    /// Whether `domain` knows the (lowercase) `term`.
    pub fn contains(&self, domain: &str, term: &str) -> bool {
        self.domains
            .get(domain)
            .is_some_and(|terms| terms.contains(term))
    }

    /// All domain labels, sorted.
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    /// Every term of every domain, flattened.
    pub fn all_terms(&self) -> HashSet<String> {
        self.domains.values().flatten().cloned().collect()
    }

    /// Iterate `(domain, terms)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HashSet<String>)> {
        self.domains.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Total number of terms across all domains (duplicates across domains
    /// counted once per domain).
    pub fn term_count(&self) -> usize {
        self.domains.values().map(HashSet::len).sum()
    }

    /// Tokens of `text` found in each domain. Domains without hits are omitted.
    pub fn domain_terms(&self, text: &str) -> BTreeMap<String, Vec<String>> {
        let lower = text.to_lowercase();
        let words: Vec<&str> = TERM_RE.find_iter(&lower).map(|m| m.as_str()).collect();

        self.domains
            .iter()
            .filter_map(|(domain, terms)| {
                let found: Vec<String> = words
                    .iter()
                    .filter(|w| terms.contains(**w))
                    .map(|w| w.to_string())
                    .collect();
                (!found.is_empty()).then(|| (domain.clone(), found))
            })
            .collect()
    }

    /// The highest-scoring domain for `text`, if any domain scores above zero.
    pub fn best_domain(&self, text: &str) -> Option<String> {
        score(text, self)
            .into_iter()
            .filter(|(_, ratio)| *ratio > 0.0)
            // BTreeMap order makes the first maximum the smallest label
            .fold(None::<(String, f64)>, |best, (domain, ratio)| match best {
                Some((_, best_ratio)) if best_ratio >= ratio => best,
                _ => Some((domain, ratio)),
            })
            .map(|(domain, _)| domain)
    }
}

/// Per-domain match ratio of `text` against `vocabulary`.
///
/// Each ratio is the number of word tokens found in that domain divided by
/// the total number of word tokens. Text without tokens scores 0.0 everywhere.
pub fn score(text: &str, vocabulary: &DomainVocabulary) -> BTreeMap<String, f64> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = WORD_RE.find_iter(&lower).map(|m| m.as_str()).collect();

    vocabulary
        .domains
        .iter()
        .map(|(domain, terms)| {
            let ratio = if words.is_empty() {
                0.0
            } else {
                let hits = words.iter().filter(|w| terms.contains(**w)).count();
                hits as f64 / words.len() as f64
            };
            (domain.clone(), ratio)
        })
        .collect()
}

/// Extract lowercase terms longer than two characters from `text`.
pub fn extract_terms(text: &str) -> impl Iterator<Item = String> + '_ {
    TERM_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|w| w.chars().count() > 2)
        .map(str::to_lowercase)
}

/// Accumulates corpora into a `DomainVocabulary`.
#[derive(Debug, Default)]
pub struct VocabularyBuilder {
    domains: BTreeMap<String, HashSet<String>>,
}

impl VocabularyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the terms of `text` to `label`.
    pub fn add_text(&mut self, label: &str, text: &str) -> &mut Self {
        let terms = self.domains.entry(label.to_string()).or_default();
        terms.extend(extract_terms(text));
        self
    }

    /// Add a labeled corpus (JSON array of `{label, text}` objects).
    ///
    /// An unreadable or malformed corpus is logged and contributes nothing.
    pub fn add_labeled_corpus(&mut self, path: &Path) -> &mut Self {
        match load_labeled_corpus(path) {
            Ok(entries) => {
                tracing::info!("Loaded {} labeled entries from {:?}", entries.len(), path);
                for (label, text) in entries {
                    self.add_text(&label, &text);
                }
            }
            Err(e) => tracing::error!("{}; continuing without it", e),
        }
        self
    }

    /// Add a free-text corpus (JSON array or JSON lines of records) under the
    /// domain `name`, reading the given text columns.
    ///
    /// An unreadable or malformed corpus is logged and contributes nothing.
    pub fn add_free_text_corpus(
        &mut self,
        name: &str,
        path: &Path,
        columns: &[String],
    ) -> &mut Self {
        let domain = name.replace('/', "_");
        match load_records(path) {
            Ok(records) => {
                let mut texts = Vec::new();
                for record in &records {
                    collect_column_texts(record, columns, &mut texts);
                }
                tracing::info!(
                    "Loaded free-text corpus '{}' from {:?}: {} records, {} text fields",
                    domain,
                    path,
                    records.len(),
                    texts.len()
                );
                let terms = self.domains.entry(domain).or_default();
                for text in texts {
                    terms.extend(extract_terms(text));
                }
            }
            Err(e) => tracing::error!("{}; continuing without it", e),
        }
        self
    }

    pub fn build(self) -> DomainVocabulary {
        DomainVocabulary {
            domains: self.domains,
        }
    }
}

/// Read `(label, text)` pairs from a labeled JSON corpus.
///
/// Entries without a string label or with empty text are skipped.
pub fn load_labeled_corpus(path: &Path) -> Result<Vec<(String, String)>, OcrError> {
    let raw = std::fs::read_to_string(path).map_err(|e| OcrError::corpus(path, e))?;
    let entries: Vec<Value> =
        serde_json::from_str(&raw).map_err(|e| OcrError::corpus(path, format!("invalid JSON: {}", e)))?;

    Ok(entries
        .iter()
        .filter_map(|entry| {
            let label = entry.get("label")?.as_str()?;
            let text = entry.get("text")?.as_str()?;
            (!label.is_empty() && !text.is_empty()).then(|| (label.to_string(), text.to_string()))
        })
        .collect())
}

/// Read records from a JSON array, a single JSON object or JSON lines.
fn load_records(path: &Path) -> Result<Vec<Value>, OcrError> {
    let raw = std::fs::read_to_string(path).map_err(|e| OcrError::corpus(path, e))?;

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(records)) => return Ok(records),
        Ok(record @ Value::Object(_)) => return Ok(vec![record]),
        Ok(_) => return Err(OcrError::corpus(path, "expected an array or object of records")),
        Err(_) => {}
    }

    let mut records = Vec::new();
    let mut bad_lines = 0usize;
    for line in raw.lines().filter(|l| !l.trim().is_empty()) {
        match serde_json::from_str::<Value>(line) {
            Ok(record) => records.push(record),
            Err(_) => bad_lines += 1,
        }
    }

    if records.is_empty() {
        return Err(OcrError::corpus(path, "no parseable JSON records"));
    }
    if bad_lines > 0 {
        tracing::warn!("Skipped {} malformed lines in {:?}", bad_lines, path);
    }
    Ok(records)
}

/// Gather text from the configured columns of one record.
fn collect_column_texts<'a>(record: &'a Value, columns: &[String], out: &mut Vec<&'a str>) {
    for column in columns {
        let Some(content) = record.get(column.as_str()) else {
            continue;
        };
        match content {
            Value::String(s) => out.push(s),
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::String(s) => out.push(s),
                        Value::Object(_) => {
                            if let Some(s) = item.get("text").and_then(Value::as_str) {
                                out.push(s);
                            }
                        }
                        _ => {}
                    }
                }
            }
            Value::Object(_) => {
                for key in NESTED_TEXT_KEYS {
                    if let Some(s) = content.get(*key).and_then(Value::as_str) {
                        out.push(s);
                    }
                }
                // Multiple-choice layouts keep the options under a `text` list
                if let Some(Value::Array(choices)) = content.get("text") {
                    out.extend(choices.iter().filter_map(Value::as_str));
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample() -> DomainVocabulary {
        DomainVocabulary::build([
            ("chemistry", "Sodium chloride dissolves in water. NaCl is salt."),
            ("physics", "Velocity and acceleration of a moving body in water"),
        ])
    }

    #[test]
    fn test_build_lowercases_and_filters_short_words() {
        let vocab = sample();
        let chem = vocab.terms("chemistry").unwrap();
        assert!(chem.contains("sodium"));
        assert!(chem.contains("nacl"));
        assert!(!chem.contains("is"));
        assert!(!chem.contains("in"));
        assert!(!chem.contains("Sodium"));
    }

    #[test]
    fn test_build_deduplicates_terms() {
        let vocab = DomainVocabulary::build([("a", "water water Water"), ("a", "water")]);
        assert_eq!(vocab.terms("a").unwrap().len(), 1);
    }

    #[test]
    fn test_build_keeps_hyphenated_terms() {
        let vocab = DomainVocabulary::build([("eng", "a well-known stress-strain curve")]);
        let terms = vocab.terms("eng").unwrap();
        assert!(terms.contains("well-known"));
        assert!(terms.contains("stress-strain"));
    }

    #[test]
    fn test_unknown_domain_is_absent() {
        let vocab = sample();
        assert!(vocab.terms("biology").is_none());
        assert!(!vocab.contains("biology", "water"));
    }

    #[test]
    fn test_all_terms_flattens_domains() {
        let vocab = sample();
        let all = vocab.all_terms();
        assert!(all.contains("sodium"));
        assert!(all.contains("velocity"));
        assert!(all.contains("water"));
    }

    #[test]
    fn test_score_ratios() {
        let vocab = sample();
        let scores = score("water velocity unknown words", &vocab);
        assert_eq!(scores["chemistry"], 0.25);
        assert_eq!(scores["physics"], 0.5);
    }

    #[test]
    fn test_score_empty_text_is_all_zero() {
        let vocab = sample();
        let scores = score("  ... !!", &vocab);
        assert_eq!(scores.len(), 2);
        assert!(scores.values().all(|v| *v == 0.0));
    }

    #[test]
    fn test_scores_need_not_sum_to_one() {
        let vocab = sample();
        let scores = score("water", &vocab);
        let total: f64 = scores.values().sum();
        assert_eq!(total, 2.0);
    }

    #[test]
    fn test_best_domain() {
        let vocab = sample();
        assert_eq!(vocab.best_domain("velocity acceleration"), Some("physics".to_string()));
        assert_eq!(vocab.best_domain("nothing relevant"), None);
        // Tie goes to the smallest label
        assert_eq!(vocab.best_domain("water"), Some("chemistry".to_string()));
    }

    #[test]
    fn test_domain_terms_omits_empty_domains() {
        let vocab = sample();
        let found = vocab.domain_terms("Sodium in the lab");
        assert_eq!(found.len(), 1);
        assert_eq!(found["chemistry"], vec!["sodium".to_string()]);
    }

    #[test]
    fn test_labeled_corpus_missing_file_degrades_to_empty() {
        let mut builder = VocabularyBuilder::new();
        builder.add_labeled_corpus(Path::new("/nonexistent/dataset.json"));
        assert!(builder.build().is_empty());
    }

    #[test]
    fn test_labeled_corpus_malformed_json_degrades_to_empty() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let mut builder = VocabularyBuilder::new();
        builder.add_labeled_corpus(file.path());
        assert!(builder.build().is_empty());
    }

    #[test]
    fn test_labeled_corpus_skips_incomplete_entries() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"label": "bio", "text": "mitochondria cell"}},
               {{"label": "", "text": "ignored words"}},
               {{"text": "unlabeled entry"}},
               {{"label": "bio", "text": ""}}]"#
        )
        .unwrap();
        let entries = load_labeled_corpus(file.path()).unwrap();
        assert_eq!(entries, vec![("bio".to_string(), "mitochondria cell".to_string())]);
    }

    #[test]
    fn test_free_text_corpus_reads_nested_columns() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"question": "Which planet orbits closest?", "choices": {{"text": ["Mercury", "Venus"], "label": ["A", "B"]}}}}"#
        )
        .unwrap();
        writeln!(file, r#"{{"support": ["photosynthesis occurs", {{"text": "chlorophyll"}}]}}"#).unwrap();

        let columns: Vec<String> = DEFAULT_TEXT_COLUMNS.iter().map(|c| c.to_string()).collect();
        let mut builder = VocabularyBuilder::new();
        builder.add_free_text_corpus("ai2/arc", file.path(), &columns);
        let vocab = builder.build();

        let terms = vocab.terms("ai2_arc").expect("domain key replaces slashes");
        for expected in ["planet", "orbits", "mercury", "venus", "photosynthesis", "chlorophyll"] {
            assert!(terms.contains(expected), "missing {}", expected);
        }
    }
}
