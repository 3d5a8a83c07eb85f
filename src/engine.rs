use crate::error::OcrError;
use image::GrayImage;

/// Trait that all OCR recognizers must implement
///
/// A recognizer only turns a normalized page bitmap into raw text. Caching,
/// correction and fallback live in `backend` and `cascade`.
pub trait Recognizer: Send + Sync {
    /// Returns the engine identifier recorded as `engine_used` (e.g. "ocrs")
    fn name(&self) -> &str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &str;

    /// Recognize the text of one normalized page image
    ///
    /// Blank pages may legitimately return empty or whitespace-only text.
    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError>;
}
