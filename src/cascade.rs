//! Engine cascade
//!
//! Pages are tried against the backends in priority order. The first backend
//! that produces non-blank text wins the page; an empty result or an error
//! moves on to the next backend. A page no backend can read is still a page
//! result, with `engine_used` set to `"None"`.

use crate::backend::{OcrBackend, Recognized};
use crate::grammar::GrammarTool;
use crate::patterns::DomainPatterns;
use crate::rasterize::PageRasterizer;
use crate::vocabulary::DomainVocabulary;
use image::DynamicImage;
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

/// `engine_used` for a page no backend could read
pub const NO_ENGINE: &str = "None";

/// Outcome of one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageResult {
    pub page_number: usize,
    pub raw_text: String,
    pub corrected_text: String,
    pub engine_used: String,
    pub grammar_issues_count: usize,
}

impl PageResult {
    fn unread(page_number: usize) -> Self {
        Self {
            page_number,
            raw_text: String::new(),
            corrected_text: String::new(),
            engine_used: NO_ENGINE.to_string(),
            grammar_issues_count: 0,
        }
    }
}

/// All pages of a document plus their combined text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentResult {
    pub pages: Vec<PageResult>,
    pub total_extracted_text: String,
}

impl DocumentResult {
    pub fn from_pages(pages: Vec<PageResult>) -> Self {
        let total_extracted_text = pages
            .iter()
            .map(|p| p.corrected_text.as_str())
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        Self {
            pages,
            total_extracted_text,
        }
    }
}

/// State of one backend for one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutcome {
    NotAttempted,
    Success(Recognized),
    Empty,
    Failed(String),
}

/// Which domain's patterns to apply to corrected text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DomainSelection {
    #[default]
    None,
    Fixed(String),
    /// Highest scoring domain for each page's corrected text
    Auto,
}

impl FromStr for DomainSelection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "" | "none" => DomainSelection::None,
            "auto" => DomainSelection::Auto,
            label => DomainSelection::Fixed(label.to_string()),
        })
    }
}

pub struct Cascade {
    backends: Vec<OcrBackend>,
    grammar: Arc<dyn GrammarTool>,
    rasterizer: Box<dyn PageRasterizer>,
    vocabulary: Arc<DomainVocabulary>,
    patterns: Arc<DomainPatterns>,
    domain: DomainSelection,
}

impl Cascade {
    /// `backends` are tried in the order given
    pub fn new(
        backends: Vec<OcrBackend>,
        grammar: Arc<dyn GrammarTool>,
        rasterizer: Box<dyn PageRasterizer>,
    ) -> Self {
        Self {
            backends,
            grammar,
            rasterizer,
            vocabulary: Arc::new(DomainVocabulary::default()),
            patterns: Arc::new(DomainPatterns::default()),
            domain: DomainSelection::None,
        }
    }

    pub fn with_domain_patterns(
        mut self,
        vocabulary: Arc<DomainVocabulary>,
        patterns: Arc<DomainPatterns>,
        domain: DomainSelection,
    ) -> Self {
        self.vocabulary = vocabulary;
        self.patterns = patterns;
        self.domain = domain;
        self
    }

    pub fn backends(&self) -> &[OcrBackend] {
        &self.backends
    }

    /// Process every page of the PDF at `path`, in page order.
    ///
    /// A missing file or a document that cannot be read yields no pages.
    pub fn process(&self, path: &Path) -> Vec<PageResult> {
        if !path.exists() {
            tracing::error!("PDF not found: {:?}", path);
            return Vec::new();
        }

        let start = Instant::now();
        let pages = match self.rasterizer.rasterize(path) {
            Ok(pages) => pages,
            Err(e) => {
                tracing::error!("Failed to read {:?}: {}", path, e);
                return Vec::new();
            }
        };

        tracing::info!("Processing {} pages from {:?}", pages.len(), path);
        let results: Vec<PageResult> = pages
            .iter()
            .enumerate()
            .map(|(i, page)| self.process_page(i + 1, page))
            .collect();

        for backend in &self.backends {
            let stats = backend.cache_stats();
            tracing::debug!(
                "{} cache: {} entries, {} hits, {} misses",
                backend.name(),
                stats.entries,
                stats.hits,
                stats.misses
            );
        }
        tracing::info!(
            "Processed {} pages in {}ms",
            results.len(),
            start.elapsed().as_millis()
        );
        results
    }

    /// Run the cascade for one rasterized page
    pub fn process_page(&self, page_number: usize, page: &DynamicImage) -> PageResult {
        let mut outcomes = vec![EngineOutcome::NotAttempted; self.backends.len()];

        for (index, backend) in self.backends.iter().enumerate() {
            tracing::info!("Page {}: attempting {}", page_number, backend.name());
            outcomes[index] = match backend.recognize(page) {
                Ok(text) if !text.is_blank() => EngineOutcome::Success(text),
                Ok(_) => {
                    tracing::info!("Page {}: {} returned no text", page_number, backend.name());
                    EngineOutcome::Empty
                }
                Err(e) => {
                    tracing::warn!("Page {}: {} failed: {}", page_number, backend.name(), e);
                    EngineOutcome::Failed(e.to_string())
                }
            };

            if let EngineOutcome::Success(text) = &outcomes[index] {
                return self.finish_page(page_number, backend, text.clone());
            }
        }

        tracing::info!("Page {}: no text extracted", page_number);
        for (backend, outcome) in self.backends.iter().zip(&outcomes) {
            match outcome {
                EngineOutcome::Failed(reason) => {
                    tracing::debug!("Page {}: {} failed ({})", page_number, backend.name(), reason)
                }
                other => tracing::debug!("Page {}: {} {:?}", page_number, backend.name(), other),
            }
        }
        PageResult::unread(page_number)
    }

    fn finish_page(&self, page_number: usize, backend: &OcrBackend, text: Recognized) -> PageResult {
        let Recognized { raw: raw_text, corrected } = text;
        let corrected_text = match self.selected_domain(&corrected) {
            Some(domain) => self.patterns.correct(&corrected, &domain),
            None => corrected,
        };

        let grammar_issues_count = match self.grammar.check(&corrected_text) {
            Ok(issues) => issues.len(),
            Err(e) => {
                tracing::warn!("Page {}: grammar check failed: {}", page_number, e);
                0
            }
        };

        tracing::info!(
            "Page {} | engine: {} | grammar issues: {}",
            page_number,
            backend.name(),
            grammar_issues_count
        );

        PageResult {
            page_number,
            raw_text,
            corrected_text,
            engine_used: backend.name().to_string(),
            grammar_issues_count,
        }
    }

    fn selected_domain(&self, text: &str) -> Option<String> {
        match &self.domain {
            DomainSelection::None => None,
            DomainSelection::Fixed(label) => Some(label.clone()),
            DomainSelection::Auto => self.vocabulary.best_domain(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(number: usize, text: &str) -> PageResult {
        PageResult {
            page_number: number,
            raw_text: text.to_string(),
            corrected_text: text.to_string(),
            engine_used: "ocrs".to_string(),
            grammar_issues_count: 0,
        }
    }

    #[test]
    fn test_domain_selection_from_str() {
        assert_eq!("none".parse::<DomainSelection>().unwrap(), DomainSelection::None);
        assert_eq!("auto".parse::<DomainSelection>().unwrap(), DomainSelection::Auto);
        assert_eq!(
            "chemistry".parse::<DomainSelection>().unwrap(),
            DomainSelection::Fixed("chemistry".to_string())
        );
    }

    #[test]
    fn test_document_result_joins_non_empty_pages() {
        let pages = vec![page(1, "First"), PageResult::unread(2), page(3, "Third")];
        let document = DocumentResult::from_pages(pages);
        assert_eq!(document.total_extracted_text, "First\n\nThird");
        assert_eq!(document.pages.len(), 3);
    }

    #[test]
    fn test_page_result_serializes_flat() {
        let value = serde_json::to_value(PageResult::unread(4)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "page_number": 4,
                "raw_text": "",
                "corrected_text": "",
                "engine_used": "None",
                "grammar_issues_count": 0
            })
        );
    }
}
