//! Leptess/Tesseract engine implementation
//!
//! Classical Tesseract OCR, the last engine the cascade tries.
//! Uses tesseract-static crate for static linking (no system dependencies).
//! Downloads tessdata (training data) automatically on first use.

use crate::engine::Recognizer;
use crate::error::OcrError;
use image::{DynamicImage, GrayImage};
use std::path::PathBuf;
use tesseract_static::tesseract::Tesseract;

use super::download::{cache_dir, ensure_downloaded};

/// Tesseract OCR recognizer
pub struct LeptessRecognizer {
    /// Path to tessdata directory
    tessdata_path: String,
    /// Language for OCR
    language: String,
}

impl LeptessRecognizer {
    /// Create a new Tesseract-based recognizer
    ///
    /// Uses `tessdata_path` when given, otherwise downloads the training data
    /// for `language` into the cache directory.
    pub fn new(tessdata_path: Option<&str>, language: &str) -> Result<Self, OcrError> {
        let tessdata_path = match tessdata_path {
            Some(path) => path.to_string(),
            None => ensure_tessdata_available(language)?,
        };

        // Validate that tessdata is accessible by doing a test initialization
        let test_tess = Tesseract::new(Some(&tessdata_path), Some(language)).map_err(|e| {
            OcrError::InitializationError(format!("Failed to initialize Tesseract: {}", e))
        })?;
        drop(test_tess);

        tracing::info!(
            "Leptess engine initialized (tessdata: {}, language: {})",
            tessdata_path,
            language
        );

        Ok(Self {
            tessdata_path,
            language: language.to_string(),
        })
    }
}

impl Recognizer for LeptessRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn description(&self) -> &str {
        "Tesseract OCR engine - classical local recognition"
    }

    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError> {
        let (width, height) = image.dimensions();

        // Convert to BMP in memory (BMP is always supported by leptonica)
        let rgb_img = DynamicImage::ImageLuma8(image.clone()).into_rgb8();
        let mut bmp_data = Vec::new();
        rgb_img
            .write_to(&mut std::io::Cursor::new(&mut bmp_data), image::ImageFormat::Bmp)
            .map_err(|e| OcrError::ProcessingError(format!("Failed to convert to BMP: {}", e)))?;

        tracing::debug!(
            "Processing image: {}x{}, BMP size: {} bytes",
            width,
            height,
            bmp_data.len()
        );

        // A fresh instance per call keeps the recognizer Sync
        let mut tess = Tesseract::new(Some(&self.tessdata_path), Some(&self.language))
            .map_err(|e| OcrError::ProcessingError(format!("Failed to create Tesseract: {}", e)))?;

        tess = tess.set_image_from_mem(&bmp_data).map_err(|e| {
            OcrError::ProcessingError(format!(
                "Failed to set image ({}x{}, {} bytes): {}",
                width,
                height,
                bmp_data.len(),
                e
            ))
        })?;

        tess = tess
            .recognize()
            .map_err(|e| OcrError::ProcessingError(format!("Failed to recognize text: {}", e)))?;

        tess.get_text()
            .map_err(|e| OcrError::ProcessingError(format!("Failed to get text: {}", e)))
    }
}

/// Ensure tessdata is available, downloading if needed
fn ensure_tessdata_available(language: &str) -> Result<String, OcrError> {
    let dir: PathBuf = cache_dir().join("tessdata");
    let filename = format!("{}.traineddata", language);
    ensure_downloaded(&tessdata_url(language), &dir, &filename)?;

    // Tesseract expects the directory, not the file
    dir.to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| OcrError::InitializationError("Invalid tessdata path".to_string()))
}

/// Get tessdata download URL for a language
fn tessdata_url(language: &str) -> String {
    // Use tessdata_fast for smaller, faster downloads
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}
