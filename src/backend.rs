//! OCR backend adapter
//!
//! Ties one recognizer to its own preprocessing, image cache and correction
//! engine so the cascade can treat all backends alike.

use crate::cache::{CacheStats, ImageCache};
use crate::correction::TextCorrector;
use crate::engine::Recognizer;
use crate::error::OcrError;
use crate::preprocessing::Pipeline;
use image::DynamicImage;

/// Raw and corrected text for one normalized page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recognized {
    pub raw: String,
    pub corrected: String,
}

impl Recognized {
    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }
}

pub struct OcrBackend {
    recognizer: Box<dyn Recognizer>,
    corrector: TextCorrector,
    pipeline: Pipeline,
    cache: ImageCache<Recognized>,
}

impl OcrBackend {
    pub fn new(recognizer: Box<dyn Recognizer>, corrector: TextCorrector) -> Self {
        Self {
            recognizer,
            corrector,
            pipeline: Pipeline::new(),
            cache: ImageCache::new(),
        }
    }

    /// Identity recorded as `engine_used`
    pub fn name(&self) -> &str {
        self.recognizer.name()
    }

    pub fn description(&self) -> &str {
        self.recognizer.description()
    }

    /// Normalize the page, recognize it and correct the text with this
    /// backend's dictionaries. An image this backend has already seen reuses
    /// both texts without recognizing or correcting again.
    pub fn recognize(&self, page: &DynamicImage) -> Result<Recognized, OcrError> {
        let normalized = self.pipeline.process(page)?;
        self.cache.get_or_compute(&normalized, |image| {
            let raw = self.recognizer.recognize(image)?;
            let corrected = if raw.trim().is_empty() {
                String::new()
            } else {
                self.corrector.correct(&raw)
            };
            Ok(Recognized { raw, corrected })
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
