use crate::error::OcrError;
use image::DynamicImage;

/// Convert image to grayscale
/// This is the foundation for the binarization step
pub fn apply(image: DynamicImage) -> Result<DynamicImage, OcrError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(OcrError::PreprocessingError(format!(
            "empty image ({}x{})",
            image.width(),
            image.height()
        )));
    }
    Ok(DynamicImage::ImageLuma8(image.to_luma8()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn test_grayscale_converts_color() {
        let mut img = RgbImage::new(10, 10);
        img.put_pixel(0, 0, Rgb([255, 0, 0])); // Red
        img.put_pixel(1, 0, Rgb([0, 255, 0])); // Green
        img.put_pixel(2, 0, Rgb([0, 0, 255])); // Blue

        let result = apply(DynamicImage::ImageRgb8(img)).unwrap();
        let gray = result.as_luma8().expect("grayscale output");

        assert!(gray.get_pixel(0, 0).0[0] > 0);
        assert!(gray.get_pixel(1, 0).0[0] > 0);
        assert!(gray.get_pixel(2, 0).0[0] > 0);
    }

    #[test]
    fn test_grayscale_drops_alpha() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([200, 200, 200, 10]));
        let result = apply(DynamicImage::ImageRgba8(img)).unwrap();
        assert!(result.as_luma8().is_some());
    }

    #[test]
    fn test_grayscale_rejects_empty_image() {
        let img = RgbImage::new(0, 0);
        assert!(apply(DynamicImage::ImageRgb8(img)).is_err());
    }
}
