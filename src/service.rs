//! Pipeline assembly
//!
//! Loads corpora and dictionaries, constructs the grammar tool and every
//! backend that can be built, and wires them into a `Cascade`.

use crate::backend::OcrBackend;
use crate::cascade::Cascade;
use crate::config::Config;
use crate::correction::TextCorrector;
use crate::engines::{build_recognizer, EngineKind, CASCADE_ORDER};
use crate::grammar::{GrammarTool, LanguageToolClient, NoGrammar};
use crate::patterns::DomainPatterns;
use crate::rasterize::EmbeddedImageRasterizer;
use crate::spelling::{FrequencySpeller, SpellingSource, SymSpellSource};
use crate::vocabulary::{DomainVocabulary, VocabularyBuilder};
use std::collections::HashSet;
use std::sync::Arc;

/// Build the domain vocabulary from the labeled dataset and any free-text
/// corpora.
pub fn load_vocabulary(config: &Config) -> DomainVocabulary {
    let mut builder = VocabularyBuilder::new();
    builder.add_labeled_corpus(&config.dataset);
    for (name, path) in &config.corpora {
        builder.add_free_text_corpus(name, path, &config.corpus_columns);
    }
    let vocabulary = builder.build();
    tracing::info!(
        "Domain vocabulary: {} domains, {} terms",
        vocabulary.len(),
        vocabulary.term_count()
    );
    vocabulary
}

pub fn build_grammar(config: &Config) -> Arc<dyn GrammarTool> {
    match &config.grammar_url {
        Some(url) => Arc::new(LanguageToolClient::new(
            url,
            &config.grammar_language,
            config.grammar_timeout,
        )),
        None => {
            tracing::info!("No grammar server configured; grammar pass disabled");
            Arc::new(NoGrammar)
        }
    }
}

/// Spelling sources, loaded on first use and shared between backends
struct Sources<'a> {
    config: &'a Config,
    domain_terms: &'a Arc<HashSet<String>>,
    dictionary: Option<Arc<dyn SpellingSource>>,
    edit_distance: Option<Arc<dyn SpellingSource>>,
}

impl<'a> Sources<'a> {
    fn for_kind(&mut self, kind: EngineKind) -> Arc<dyn SpellingSource> {
        if kind.uses_edit_distance() {
            let config = self.config;
            Arc::clone(self.edit_distance.get_or_insert_with(|| {
                let source: Arc<dyn SpellingSource> =
                    Arc::new(SymSpellSource::from_files(&config.frequency_dict, &config.bigram_dict));
                source
            }))
        } else {
            let config = self.config;
            let domain_terms = self.domain_terms;
            Arc::clone(self.dictionary.get_or_insert_with(|| {
                let mut speller = FrequencySpeller::from_file_or_empty(&config.spell_dict);
                speller.load_words(domain_terms.iter());
                let source: Arc<dyn SpellingSource> = Arc::new(speller);
                source
            }))
        }
    }
}

/// Assemble the cascade described by `config`. Backends that cannot be
/// constructed are logged and left out; the rest keep their fixed order.
pub fn build_cascade(config: &Config) -> Cascade {
    let vocabulary = Arc::new(load_vocabulary(config));
    let patterns = Arc::new(DomainPatterns::from_labeled_corpus(&config.dataset));
    let domain_terms = Arc::new(vocabulary.all_terms());
    let grammar = build_grammar(config);

    let mut sources = Sources {
        config,
        domain_terms: &domain_terms,
        dictionary: None,
        edit_distance: None,
    };

    let mut backends = Vec::new();
    for kind in CASCADE_ORDER {
        let recognizer = match build_recognizer(kind, config) {
            Ok(recognizer) => recognizer,
            Err(e) => {
                tracing::warn!("Skipping {} backend: {}", kind.name(), e);
                continue;
            }
        };
        let corrector = TextCorrector::new(
            Arc::clone(&domain_terms),
            sources.for_kind(kind),
            Arc::clone(&grammar),
            kind.min_word_len(),
        );
        tracing::info!(
            "Backend {} ready ({}, correction via {})",
            recognizer.name(),
            recognizer.description(),
            corrector.source_name()
        );
        backends.push(OcrBackend::new(recognizer, corrector));
    }

    if backends.is_empty() {
        tracing::warn!("No OCR backends available; every page will report engine_used = None");
    }

    Cascade::new(
        backends,
        grammar,
        Box::new(EmbeddedImageRasterizer::new(config.dpi)),
    )
    .with_domain_patterns(vocabulary, patterns, config.domain.clone())
}
