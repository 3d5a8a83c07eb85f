use crate::error::OcrError;
use image::{DynamicImage, GrayImage};
use serde::Serialize;
use std::time::Instant;

use super::digest::ImageDigest;
use super::steps;

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Normalized page image, ready for recognition and cache lookup
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// Binarized grayscale bitmap fed to the recognizer
    pub image: GrayImage,
    /// Cache key computed over `image`
    pub digest: ImageDigest,
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Preprocessing pipeline: grayscale, then Otsu binarization
#[derive(Debug, Clone, Copy, Default)]
pub struct Pipeline;

impl Pipeline {
    pub fn new() -> Self {
        Self
    }

    /// Normalize a page image and compute its digest
    pub fn process(&self, image: &DynamicImage) -> Result<NormalizedImage, OcrError> {
        let start = Instant::now();
        let mut steps_timing = Vec::new();

        let mut img = image.clone();
        img = self.run_step("grayscale", img, &mut steps_timing, steps::grayscale::apply)?;
        img = self.run_step("threshold", img, &mut steps_timing, steps::threshold::apply)?;

        let image = match img {
            DynamicImage::ImageLuma8(gray) => gray,
            other => other.to_luma8(),
        };
        let digest = ImageDigest::of(&image);

        let total_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            "Normalized {}x{} image in {}ms (digest {})",
            image.width(),
            image.height(),
            total_time_ms,
            digest
        );

        Ok(NormalizedImage {
            image,
            digest,
            total_time_ms,
            steps: steps_timing,
        })
    }

    fn run_step<F>(
        &self,
        name: &str,
        img: DynamicImage,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<DynamicImage, OcrError>
    where
        F: FnOnce(DynamicImage) -> Result<DynamicImage, OcrError>,
    {
        let step_start = Instant::now();
        let result = step_fn(img)?;
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms: step_start.elapsed().as_millis() as u64,
        });
        Ok(result)
    }
}
