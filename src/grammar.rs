//! Grammar checking and correction
//!
//! One grammar tool is constructed at startup and shared by every correction
//! engine and the cascade as `Arc<dyn GrammarTool>`.

use crate::error::OcrError;
use serde::Deserialize;
use std::time::Duration;

/// A single issue reported by the grammar tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarIssue {
    pub message: String,
    /// Start of the flagged span in UTF-16 code units
    pub offset: usize,
    /// Length of the flagged span in UTF-16 code units
    pub length: usize,
    pub replacements: Vec<String>,
    pub rule_id: String,
}

pub trait GrammarTool: Send + Sync {
    /// Issues found in `text`
    fn check(&self, text: &str) -> Result<Vec<GrammarIssue>, OcrError>;

    /// `text` with the first suggested replacement of every issue applied
    fn correct(&self, text: &str) -> Result<String, OcrError> {
        let issues = self.check(text)?;
        Ok(apply_replacements(text, &issues))
    }
}

/// Grammar tool that finds nothing and changes nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGrammar;

impl GrammarTool for NoGrammar {
    fn check(&self, _text: &str) -> Result<Vec<GrammarIssue>, OcrError> {
        Ok(Vec::new())
    }

    fn correct(&self, text: &str) -> Result<String, OcrError> {
        Ok(text.to_string())
    }
}

/// Client for a LanguageTool HTTP server (`POST /v2/check`)
pub struct LanguageToolClient {
    agent: ureq::Agent,
    check_url: String,
    language: String,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
struct Match {
    #[serde(default)]
    message: String,
    offset: usize,
    length: usize,
    #[serde(default)]
    replacements: Vec<Replacement>,
    rule: Option<Rule>,
}

#[derive(Debug, Deserialize)]
struct Replacement {
    value: String,
}

#[derive(Debug, Deserialize)]
struct Rule {
    #[serde(default)]
    id: String,
}

impl LanguageToolClient {
    pub fn new(base_url: &str, language: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        let check_url = format!("{}/v2/check", base_url.trim_end_matches('/'));

        tracing::info!("LanguageTool client configured ({}, {})", check_url, language);

        Self {
            agent,
            check_url,
            language: language.to_string(),
        }
    }
}

impl GrammarTool for LanguageToolClient {
    fn check(&self, text: &str) -> Result<Vec<GrammarIssue>, OcrError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .agent
            .post(&self.check_url)
            .send_form([("text", text), ("language", self.language.as_str())])
            .map_err(|e| OcrError::GrammarError(format!("LanguageTool request failed: {}", e)))?;

        let body = response
            .into_body()
            .read_to_string()
            .map_err(|e| OcrError::GrammarError(format!("Failed to read LanguageTool response: {}", e)))?;

        parse_check_response(&body)
    }
}

fn parse_check_response(body: &str) -> Result<Vec<GrammarIssue>, OcrError> {
    let response: CheckResponse = serde_json::from_str(body)
        .map_err(|e| OcrError::GrammarError(format!("Invalid LanguageTool response: {}", e)))?;

    Ok(response
        .matches
        .into_iter()
        .map(|m| GrammarIssue {
            message: m.message,
            offset: m.offset,
            length: m.length,
            replacements: m.replacements.into_iter().map(|r| r.value).collect(),
            rule_id: m.rule.map(|r| r.id).unwrap_or_default(),
        })
        .collect())
}

/// Apply the first replacement of each issue. Issues without replacements,
/// out of range, or overlapping an already applied span are skipped.
pub fn apply_replacements(text: &str, issues: &[GrammarIssue]) -> String {
    let units: Vec<u16> = text.encode_utf16().collect();

    let mut edits: Vec<(usize, usize, &str)> = issues
        .iter()
        .filter_map(|issue| {
            let replacement = issue.replacements.first()?;
            let end = issue.offset.checked_add(issue.length)?;
            (end <= units.len()).then_some((issue.offset, end, replacement.as_str()))
        })
        .collect();
    edits.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));

    // Applied from the end so earlier offsets stay valid
    let mut out = units;
    let mut floor = usize::MAX;
    for (start, end, replacement) in edits {
        if end > floor {
            continue;
        }
        out.splice(start..end, replacement.encode_utf16());
        floor = start;
    }

    String::from_utf16(&out).unwrap_or_else(|_| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(offset: usize, length: usize, replacements: &[&str]) -> GrammarIssue {
        GrammarIssue {
            message: String::new(),
            offset,
            length,
            replacements: replacements.iter().map(|s| s.to_string()).collect(),
            rule_id: String::new(),
        }
    }

    #[test]
    fn test_parse_check_response() {
        let body = r#"{
            "software": {"name": "LanguageTool"},
            "matches": [{
                "message": "Possible typo",
                "offset": 0,
                "length": 4,
                "replacements": [{"value": "This"}, {"value": "Thus"}],
                "rule": {"id": "MORFOLOGIK_RULE_EN_US"}
            }]
        }"#;
        let issues = parse_check_response(body).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].replacements, vec!["This", "Thus"]);
        assert_eq!(issues[0].rule_id, "MORFOLOGIK_RULE_EN_US");
    }

    #[test]
    fn test_parse_invalid_response_is_grammar_error() {
        let err = parse_check_response("<html>").unwrap_err();
        assert!(matches!(err, OcrError::GrammarError(_)));
    }

    #[test]
    fn test_apply_replacements_in_order() {
        let text = "Thsi is a apple";
        let issues = vec![issue(0, 4, &["This"]), issue(8, 1, &["an"])];
        assert_eq!(apply_replacements(text, &issues), "This is an apple");
    }

    #[test]
    fn test_apply_replacements_skips_empty_and_overlapping() {
        let text = "aa bb cc";
        let issues = vec![
            issue(0, 2, &[]),
            issue(3, 2, &["BB"]),
            issue(4, 3, &["XX"]),
            issue(6, 9, &["out of range"]),
        ];
        assert_eq!(apply_replacements(text, &issues), "aa bXXc");
    }

    #[test]
    fn test_apply_replacements_uses_utf16_offsets() {
        // The emoji occupies two UTF-16 code units
        let text = "😀 teh end";
        let issues = vec![issue(3, 3, &["the"])];
        assert_eq!(apply_replacements(text, &issues), "😀 the end");
    }

    #[test]
    fn test_no_grammar_is_identity() {
        assert_eq!(NoGrammar.correct(" text ").unwrap(), " text ");
        assert!(NoGrammar.check("text").unwrap().is_empty());
    }
}
