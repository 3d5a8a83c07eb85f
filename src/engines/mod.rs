//! OCR engine implementations
//!
//! This module contains implementations of the Recognizer trait for the three
//! cascade backends. Local engines are conditionally compiled based on
//! feature flags; the cloud engine is always available.

#[cfg(any(feature = "engine-ocrs", feature = "engine-leptess"))]
pub mod download;

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

#[cfg(feature = "engine-leptess")]
pub mod leptess;

pub mod vision;

use crate::config::Config;
use crate::engine::Recognizer;
use crate::error::OcrError;

/// The three backend slots of the cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// ocrs neural detection and recognition
    NeuralLocal,
    /// Google Cloud Vision
    Cloud,
    /// Tesseract
    ClassicalLocal,
}

/// Fixed priority order in which backends are tried
pub const CASCADE_ORDER: [EngineKind; 3] = [
    EngineKind::NeuralLocal,
    EngineKind::Cloud,
    EngineKind::ClassicalLocal,
];

impl EngineKind {
    pub fn name(&self) -> &'static str {
        match self {
            EngineKind::NeuralLocal => "ocrs",
            EngineKind::Cloud => "google-vision",
            EngineKind::ClassicalLocal => "tesseract",
        }
    }

    /// Shortest word the backend's correction engine will try to correct.
    /// The neural backend pairs with the edit-distance source and also
    /// repairs two-letter words.
    pub fn min_word_len(&self) -> usize {
        match self {
            EngineKind::NeuralLocal => 2,
            EngineKind::Cloud | EngineKind::ClassicalLocal => 3,
        }
    }

    /// Whether correction uses the edit-distance source rather than the
    /// frequency dictionary
    pub fn uses_edit_distance(&self) -> bool {
        matches!(self, EngineKind::NeuralLocal)
    }
}

/// Construct the recognizer for `kind`
pub fn build_recognizer(kind: EngineKind, config: &Config) -> Result<Box<dyn Recognizer>, OcrError> {
    match kind {
        EngineKind::NeuralLocal => build_ocrs(),
        EngineKind::Cloud => {
            let api_key = config.vision_api_key.as_deref().ok_or_else(|| {
                OcrError::BackendUnavailable(
                    "google-vision: no API key configured (GOOGLE_VISION_API_KEY)".to_string(),
                )
            })?;
            let recognizer =
                vision::VisionRecognizer::new(api_key, &config.vision_endpoint, config.vision_timeout)?;
            Ok(Box::new(recognizer))
        }
        EngineKind::ClassicalLocal => build_leptess(config),
    }
}

#[cfg(feature = "engine-ocrs")]
fn build_ocrs() -> Result<Box<dyn Recognizer>, OcrError> {
    Ok(Box::new(ocrs::OcrsRecognizer::new()?))
}

#[cfg(not(feature = "engine-ocrs"))]
fn build_ocrs() -> Result<Box<dyn Recognizer>, OcrError> {
    Err(OcrError::BackendUnavailable(
        "ocrs: not compiled in, build with --features engine-ocrs".to_string(),
    ))
}

#[cfg(feature = "engine-leptess")]
fn build_leptess(config: &Config) -> Result<Box<dyn Recognizer>, OcrError> {
    let recognizer = leptess::LeptessRecognizer::new(config.tessdata_path.as_deref(), &config.language)?;
    Ok(Box::new(recognizer))
}

#[cfg(not(feature = "engine-leptess"))]
fn build_leptess(_config: &Config) -> Result<Box<dyn Recognizer>, OcrError> {
    Err(OcrError::BackendUnavailable(
        "tesseract: not compiled in, build with --features engine-leptess".to_string(),
    ))
}
