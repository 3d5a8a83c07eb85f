use image::{DynamicImage, GrayImage, Luma};
use ocr_cascade::backend::OcrBackend;
use ocr_cascade::cascade::{Cascade, DomainSelection, PageResult};
use ocr_cascade::correction::TextCorrector;
use ocr_cascade::engine::Recognizer;
use ocr_cascade::error::OcrError;
use ocr_cascade::grammar::{GrammarIssue, GrammarTool, NoGrammar};
use ocr_cascade::patterns::DomainPatterns;
use ocr_cascade::rasterize::{EmbeddedImageRasterizer, PageRasterizer};
use ocr_cascade::spelling::{FrequencySpeller, SpellingSource, SymSpell, SymSpellSource};
use ocr_cascade::vocabulary::DomainVocabulary;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Recognizer returning a fixed response and counting its calls
struct MockRecognizer {
    name: &'static str,
    response: Result<&'static str, &'static str>,
    calls: Arc<AtomicUsize>,
}

impl MockRecognizer {
    fn new(name: &'static str, response: Result<&'static str, &'static str>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                name,
                response,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl Recognizer for MockRecognizer {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "mock recognizer"
    }

    fn recognize(&self, _image: &GrayImage) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response
            .map(str::to_string)
            .map_err(|e| OcrError::ProcessingError(e.to_string()))
    }
}

struct NoSuggestions;

impl SpellingSource for NoSuggestions {
    fn name(&self) -> &str {
        "none"
    }

    fn suggest(&self, _word: &str, _previous: Option<&str>) -> Option<String> {
        None
    }
}

/// Spelling source suggesting nothing while counting lookups
struct CountingSpeller(Arc<AtomicUsize>);

impl SpellingSource for CountingSpeller {
    fn name(&self) -> &str {
        "counting"
    }

    fn suggest(&self, _word: &str, _previous: Option<&str>) -> Option<String> {
        self.0.fetch_add(1, Ordering::SeqCst);
        None
    }
}

/// Grammar tool reporting a fixed number of issues without changing text
struct CountingGrammar(usize);

impl GrammarTool for CountingGrammar {
    fn check(&self, text: &str) -> Result<Vec<GrammarIssue>, OcrError> {
        Ok((0..self.0)
            .map(|i| GrammarIssue {
                message: format!("issue {}", i),
                offset: 0,
                length: text.len().min(1),
                replacements: Vec::new(),
                rule_id: "TEST".to_string(),
            })
            .collect())
    }
}

struct BrokenGrammar;

impl GrammarTool for BrokenGrammar {
    fn check(&self, _text: &str) -> Result<Vec<GrammarIssue>, OcrError> {
        Err(OcrError::GrammarError("server unreachable".to_string()))
    }
}

/// Rasterizer returning a fixed number of blank pages
struct FixedPages(usize);

impl PageRasterizer for FixedPages {
    fn rasterize(&self, _path: &Path) -> Result<Vec<DynamicImage>, OcrError> {
        Ok((0..self.0).map(|_| blank_page()).collect())
    }
}

struct UnreadableDocument;

impl PageRasterizer for UnreadableDocument {
    fn rasterize(&self, _path: &Path) -> Result<Vec<DynamicImage>, OcrError> {
        Err(OcrError::ProcessingError("corrupt xref table".to_string()))
    }
}

fn blank_page() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(16, 16, Luma([255u8])))
}

fn plain_backend(recognizer: MockRecognizer) -> OcrBackend {
    let corrector = TextCorrector::new(
        Arc::new(HashSet::new()),
        Arc::new(NoSuggestions),
        Arc::new(NoGrammar),
        2,
    );
    OcrBackend::new(Box::new(recognizer), corrector)
}

fn cascade(backends: Vec<OcrBackend>) -> Cascade {
    Cascade::new(
        backends,
        Arc::new(NoGrammar),
        Box::new(EmbeddedImageRasterizer::default()),
    )
}

#[test]
fn test_falls_back_to_next_backend_on_empty() {
    let (b, b_calls) = MockRecognizer::new("Backend-B", Ok(""));
    let (a, a_calls) = MockRecognizer::new("Backend-A", Ok("Hello world"));
    let (c, c_calls) = MockRecognizer::new("Backend-C", Ok("never used"));
    let cascade = cascade(vec![plain_backend(b), plain_backend(a), plain_backend(c)]);

    let result = cascade.process_page(1, &blank_page());

    assert_eq!(result.engine_used, "Backend-A");
    assert_eq!(result.raw_text, "Hello world");
    assert_eq!(result.corrected_text, "Hello world");
    assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    assert_eq!(a_calls.load(Ordering::SeqCst), 1);
    assert_eq!(c_calls.load(Ordering::SeqCst), 0, "Backend-C must not run");
}

#[test]
fn test_falls_back_on_error() {
    let (b, _) = MockRecognizer::new("Backend-B", Err("model crashed"));
    let (a, _) = MockRecognizer::new("Backend-A", Err("timeout"));
    let (c, _) = MockRecognizer::new("Backend-C", Ok("Tesseract text"));
    let cascade = cascade(vec![plain_backend(b), plain_backend(a), plain_backend(c)]);

    let result = cascade.process_page(3, &blank_page());

    assert_eq!(result.page_number, 3);
    assert_eq!(result.engine_used, "Backend-C");
    assert_eq!(result.raw_text, "Tesseract text");
}

#[test]
fn test_total_failure_is_a_normal_page_result() {
    let (b, _) = MockRecognizer::new("Backend-B", Ok("   \n"));
    let (a, _) = MockRecognizer::new("Backend-A", Err("quota exceeded"));
    let (c, _) = MockRecognizer::new("Backend-C", Ok(""));
    let cascade = cascade(vec![plain_backend(b), plain_backend(a), plain_backend(c)]);

    let result = cascade.process_page(2, &blank_page());

    assert_eq!(
        result,
        PageResult {
            page_number: 2,
            raw_text: String::new(),
            corrected_text: String::new(),
            engine_used: "None".to_string(),
            grammar_issues_count: 0,
        }
    );
}

#[test]
fn test_no_backends_reports_none() {
    let result = cascade(Vec::new()).process_page(1, &blank_page());
    assert_eq!(result.engine_used, "None");
}

#[test]
fn test_identical_page_is_recognized_and_corrected_once() {
    let (b, calls) = MockRecognizer::new("Backend-B", Ok("cached text"));
    let lookups = Arc::new(AtomicUsize::new(0));
    let corrector = TextCorrector::new(
        Arc::new(HashSet::new()),
        Arc::new(CountingSpeller(Arc::clone(&lookups))),
        Arc::new(NoGrammar),
        2,
    );
    let cascade = cascade(vec![OcrBackend::new(Box::new(b), corrector)]);

    let first = cascade.process_page(1, &blank_page());
    let lookups_after_first = lookups.load(Ordering::SeqCst);
    let second = cascade.process_page(2, &blank_page());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(lookups_after_first, 2);
    assert_eq!(lookups.load(Ordering::SeqCst), 2, "cache hit must not correct again");
    assert_eq!(first.raw_text, second.raw_text);
    assert_eq!(first.corrected_text, second.corrected_text);
    assert_eq!(cascade.backends()[0].cache_stats().hits, 1);
}

#[test]
fn test_failures_are_not_cached() {
    let (b, calls) = MockRecognizer::new("Backend-B", Err("flaky"));
    let cascade = cascade(vec![plain_backend(b)]);

    cascade.process_page(1, &blank_page());
    cascade.process_page(2, &blank_page());

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_domain_terms_survive_correction() {
    let mut speller = FrequencySpeller::new();
    speller.load_words(["the", "hydrocarbons", "reservoirs"]);
    let domain_terms: HashSet<String> = ["hydrocarbon", "reservoir"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let corrector = TextCorrector::new(Arc::new(domain_terms), Arc::new(speller), Arc::new(NoGrammar), 3);
    let (a, _) = MockRecognizer::new("Backend-A", Ok("Teh Hydrocarbon reservoir"));
    let cascade = cascade(vec![OcrBackend::new(Box::new(a), corrector)]);

    let result = cascade.process_page(1, &blank_page());

    assert_eq!(result.raw_text, "Teh Hydrocarbon reservoir");
    assert_eq!(result.corrected_text, "The Hydrocarbon reservoir");
}

#[test]
fn test_hyphenated_domain_terms_survive_every_speller() {
    let vocabulary = DomainVocabulary::build([("medicine", "An anti-tumour agent")]);
    assert!(vocabulary.contains("medicine", "anti-tumour"));
    let domain_terms = Arc::new(vocabulary.all_terms());

    let mut frequency = FrequencySpeller::new();
    frequency.load_words(["tumor", "agent"]);
    let mut symspell = SymSpell::default();
    symspell.create_entry("tumor", 5000);
    symspell.create_entry("agent", 5000);
    let sources: Vec<(Arc<dyn SpellingSource>, &str, &str)> = vec![
        (Arc::new(frequency) as Arc<dyn SpellingSource>, "an anti-tumour agent", "an anti-tumour agent"),
        (Arc::new(SymSpellSource::new(symspell)), "Anti-Tumour agnet", "Anti-Tumour agent"),
    ];

    for (source, raw, expected) in sources {
        let corrector = TextCorrector::new(Arc::clone(&domain_terms), source, Arc::new(NoGrammar), 2);
        assert_eq!(corrector.correct(raw), expected);
        assert_eq!(corrector.correct("pro-tumour"), "pro-tumor");
    }
}

#[test]
fn test_grammar_issues_are_counted() {
    let (b, _) = MockRecognizer::new("Backend-B", Ok("some text"));
    let cascade = Cascade::new(
        vec![plain_backend(b)],
        Arc::new(CountingGrammar(2)),
        Box::new(EmbeddedImageRasterizer::default()),
    );
    assert_eq!(cascade.process_page(1, &blank_page()).grammar_issues_count, 2);
}

#[test]
fn test_grammar_failure_counts_as_zero_issues() {
    let (b, _) = MockRecognizer::new("Backend-B", Ok("some text"));
    let cascade = Cascade::new(
        vec![plain_backend(b)],
        Arc::new(BrokenGrammar),
        Box::new(EmbeddedImageRasterizer::default()),
    );

    let result = cascade.process_page(1, &blank_page());

    assert_eq!(result.engine_used, "Backend-B");
    assert_eq!(result.corrected_text, "some text");
    assert_eq!(result.grammar_issues_count, 0);
}

#[test]
fn test_fixed_domain_applies_patterns() {
    let corpus = [("chemistry", "Baking soda is NaHCO3")];
    let vocabulary = Arc::new(DomainVocabulary::build(corpus));
    let patterns = Arc::new(DomainPatterns::build(corpus));
    let (b, _) = MockRecognizer::new("Backend-B", Ok("  formula NaHCO here "));
    let cascade = cascade(vec![plain_backend(b)]).with_domain_patterns(
        vocabulary,
        patterns,
        DomainSelection::Fixed("chemistry".to_string()),
    );

    let result = cascade.process_page(1, &blank_page());

    assert_eq!(result.raw_text, "  formula NaHCO here ");
    assert_eq!(result.corrected_text, "formula NaHCO3 here");
}

#[test]
fn test_process_numbers_pages_in_order() {
    let (b, _) = MockRecognizer::new("Backend-B", Ok("page text"));
    let cascade = Cascade::new(vec![plain_backend(b)], Arc::new(NoGrammar), Box::new(FixedPages(3)));
    let file = tempfile::NamedTempFile::new().unwrap();

    let pages = cascade.process(file.path());

    let numbers: Vec<_> = pages.iter().map(|p| p.page_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
}

#[test]
fn test_process_missing_file_yields_no_pages() {
    let (b, calls) = MockRecognizer::new("Backend-B", Ok("text"));
    let cascade = Cascade::new(vec![plain_backend(b)], Arc::new(NoGrammar), Box::new(FixedPages(2)));

    assert!(cascade.process(Path::new("/nonexistent/scan.pdf")).is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_process_unreadable_document_yields_no_pages() {
    let (b, _) = MockRecognizer::new("Backend-B", Ok("text"));
    let cascade = Cascade::new(vec![plain_backend(b)], Arc::new(NoGrammar), Box::new(UnreadableDocument));
    let file = tempfile::NamedTempFile::new().unwrap();

    assert!(cascade.process(file.path()).is_empty());
}
