//! OCRS engine implementation
//!
//! Pure Rust neural text detection and recognition using the ocrs library.
//! This is the local neural backend and the first engine the cascade tries.
//! Downloads neural network models automatically on first use.

use crate::engine::Recognizer;
use crate::error::OcrError;
use image::{DynamicImage, GrayImage};
use ocrs::{DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams};
use rten::Model;

use super::download::{cache_dir, ensure_downloaded};

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// Recognizer wrapping the ocrs library
pub struct OcrsRecognizer {
    engine: OcrsOcrEngine,
}

impl OcrsRecognizer {
    /// Create a new recognizer, downloading models if needed
    pub fn new() -> Result<Self, OcrError> {
        tracing::info!("Initializing ocrs OCR engine...");

        let model_dir = cache_dir();
        let detection_model_path =
            ensure_downloaded(DETECTION_MODEL_URL, &model_dir, "text-detection.rten")?;
        let recognition_model_path =
            ensure_downloaded(RECOGNITION_MODEL_URL, &model_dir, "text-recognition.rten")?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            OcrError::InitializationError(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            OcrError::InitializationError(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrsOcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            OcrError::InitializationError(format!("Failed to create OCR engine: {}", e))
        })?;

        tracing::info!("ocrs engine initialized successfully");

        Ok(Self { engine })
    }
}

impl Recognizer for OcrsRecognizer {
    fn name(&self) -> &str {
        "ocrs"
    }

    fn description(&self) -> &str {
        "Pure Rust neural OCR engine - local text detection and recognition"
    }

    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError> {
        // ImageSource::from_bytes expects RGB in HWC order
        let rgb_img = DynamicImage::ImageLuma8(image.clone()).into_rgb8();
        let dimensions = rgb_img.dimensions();

        let img_source = ImageSource::from_bytes(rgb_img.as_raw(), dimensions).map_err(|e| {
            OcrError::ProcessingError(format!("Failed to create image source: {}", e))
        })?;

        let ocr_input = self
            .engine
            .prepare_input(img_source)
            .map_err(|e| OcrError::ProcessingError(format!("Failed to prepare input: {}", e)))?;

        let word_rects = self
            .engine
            .detect_words(&ocr_input)
            .map_err(|e| OcrError::ProcessingError(format!("Failed to detect words: {}", e)))?;

        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| OcrError::ProcessingError(format!("Failed to recognize text: {}", e)))?;

        // Recognized fragments are joined with single spaces
        let text = line_texts
            .iter()
            .filter_map(|line| line.as_ref())
            .map(|line| {
                line.words()
                    .map(|word| word.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        tracing::debug!(
            "ocrs recognized {} lines, {} chars",
            line_rects.len(),
            text.len()
        );

        Ok(text)
    }
}
