use crate::error::OcrError;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;

/// Apply global Otsu binarization
/// Pixels brighter than the Otsu level become white, the rest black
pub fn apply(image: DynamicImage) -> Result<DynamicImage, OcrError> {
    let gray = image.to_luma8();
    let level = otsu_level(&gray);
    tracing::trace!("Otsu level: {}", level);
    Ok(DynamicImage::ImageLuma8(binarize(&gray, level)))
}

fn binarize(img: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if img.get_pixel(x, y).0[0] > level {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}
