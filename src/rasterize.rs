//! PDF page rasterization
//!
//! Turns each page of a scanned PDF into a `DynamicImage`. Scanned documents
//! carry one raster image per page, so the default rasterizer decodes the
//! largest image XObject a page draws rather than rendering vector content.

use crate::error::OcrError;
use image::{DynamicImage, GrayImage, Luma, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream};
use std::path::Path;

/// PDF default user space unit
const POINTS_PER_INCH: f32 = 72.0;
/// US Letter, used when a page has no usable MediaBox
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];
/// Form XObjects nested deeper than this are not searched for images
const MAX_FORM_DEPTH: usize = 4;

/// Produces one image per page, in page order
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, path: &Path) -> Result<Vec<DynamicImage>, OcrError>;
}

/// Rasterizer that decodes the images embedded in each page
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedImageRasterizer {
    /// Resolution used to size pages without a decodable image
    dpi: u32,
}

impl EmbeddedImageRasterizer {
    pub fn new(dpi: u32) -> Self {
        Self { dpi: dpi.max(1) }
    }

    fn blank_page(&self, doc: &Document, page: &Dictionary) -> DynamicImage {
        let media_box = inherited(doc, page, b"MediaBox")
            .and_then(|obj| obj.as_array().ok())
            .and_then(|arr| {
                let nums: Vec<f32> = arr.iter().filter_map(|o| number(doc, o)).collect();
                (nums.len() == 4).then(|| [nums[0], nums[1], nums[2], nums[3]])
            })
            .unwrap_or(DEFAULT_MEDIA_BOX);

        let scale = self.dpi as f32 / POINTS_PER_INCH;
        let width = ((media_box[2] - media_box[0]).abs() * scale).round().max(1.0) as u32;
        let height = ((media_box[3] - media_box[1]).abs() * scale).round().max(1.0) as u32;
        DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([255u8])))
    }
}

impl Default for EmbeddedImageRasterizer {
    fn default() -> Self {
        Self::new(150)
    }
}

impl PageRasterizer for EmbeddedImageRasterizer {
    fn rasterize(&self, path: &Path) -> Result<Vec<DynamicImage>, OcrError> {
        let doc = Document::load(path)
            .map_err(|e| OcrError::ProcessingError(format!("Failed to load PDF: {}", e)))?;

        let mut pages = Vec::new();
        for (page_number, page_id) in doc.get_pages() {
            let page = doc
                .get_object(page_id)
                .and_then(Object::as_dict)
                .map_err(|e| {
                    OcrError::ProcessingError(format!("Invalid page {}: {}", page_number, e))
                })?;

            let mut images = Vec::new();
            if let Some(resources) = inherited(&doc, page, b"Resources").and_then(|o| o.as_dict().ok()) {
                collect_images(&doc, resources, 0, &mut images);
            }

            let mut decoded = Vec::new();
            for stream in images {
                match decode_image(&doc, stream) {
                    Ok(img) => decoded.push(img),
                    Err(e) => tracing::warn!("Skipping image on page {}: {}", page_number, e),
                }
            }

            let image = decoded
                .into_iter()
                .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()));
            match image {
                Some(img) => pages.push(img),
                None => {
                    tracing::debug!("Page {} has no raster image; using a blank page", page_number);
                    pages.push(self.blank_page(&doc, page));
                }
            }
        }

        tracing::info!("Rasterized {} pages from {:?}", pages.len(), path);
        Ok(pages)
    }
}

/// Follow a reference to the object it points at
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn number(doc: &Document, obj: &Object) -> Option<f32> {
    match resolve(doc, obj)? {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Look up a page attribute, walking up the page tree for inherited keys
fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut node = page;
    // Bounded walk guards against cyclic Parent links
    for _ in 0..32 {
        if let Ok(value) = node.get(key) {
            return resolve(doc, value);
        }
        let parent = node.get(b"Parent").ok().and_then(|p| resolve(doc, p))?;
        node = parent.as_dict().ok()?;
    }
    None
}

/// Collect image XObject streams reachable from a resource dictionary
fn collect_images<'a>(
    doc: &'a Document,
    resources: &'a Dictionary,
    depth: usize,
    out: &mut Vec<&'a Stream>,
) {
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
    else {
        return;
    };

    for (_, value) in xobjects.iter() {
        let Some(stream) = resolve(doc, value).and_then(|o| o.as_stream().ok()) else {
            continue;
        };
        match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => out.push(stream),
            Ok(b"Form") if depth < MAX_FORM_DEPTH => {
                if let Some(inner) = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|o| resolve(doc, o))
                    .and_then(|o| o.as_dict().ok())
                {
                    collect_images(doc, inner, depth + 1, out);
                }
            }
            _ => {}
        }
    }
}

/// Names of the filters applied to a stream
fn filters(stream: &Stream) -> Vec<Vec<u8>> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|o| o.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// Decode an image XObject into a `DynamicImage`
fn decode_image(doc: &Document, stream: &Stream) -> Result<DynamicImage, OcrError> {
    let filters = filters(stream);

    if filters.iter().any(|f| f == b"DCTDecode") {
        return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
            .map_err(|e| OcrError::ProcessingError(format!("Failed to decode JPEG: {}", e)));
    }
    if let Some(unsupported) = filters
        .iter()
        .find(|f| matches!(f.as_slice(), b"JPXDecode" | b"CCITTFaxDecode" | b"JBIG2Decode"))
    {
        return Err(OcrError::ProcessingError(format!(
            "Unsupported image filter: {}",
            String::from_utf8_lossy(unsupported)
        )));
    }

    let width = dimension(stream, b"Width")?;
    let height = dimension(stream, b"Height")?;

    let data = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream
            .decompressed_content()
            .map_err(|e| OcrError::ProcessingError(format!("Failed to decompress image: {}", e)))?
    };

    let image_mask = matches!(stream.dict.get(b"ImageMask"), Ok(Object::Boolean(true)));
    let bits_per_component = stream
        .dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|b| b.as_i64().ok())
        .unwrap_or(if image_mask { 1 } else { 8 });

    if bits_per_component == 1 {
        // Image masks paint where the sample is 0; plain bitmaps treat 1 as white
        return unpack_bilevel(&data, width, height, image_mask).map(DynamicImage::ImageLuma8);
    }
    if bits_per_component != 8 {
        return Err(OcrError::ProcessingError(format!(
            "Unsupported bits per component: {}",
            bits_per_component
        )));
    }

    let pixels = width as usize * height as usize;
    match color_space(doc, stream).as_str() {
        "DeviceGray" | "CalGray" => {
            let data = truncate_samples(data, pixels, "grayscale")?;
            let img = GrayImage::from_raw(width, height, data).ok_or_else(|| {
                OcrError::ProcessingError("Invalid grayscale image data".to_string())
            })?;
            Ok(DynamicImage::ImageLuma8(img))
        }
        "DeviceRGB" | "CalRGB" => {
            let data = truncate_samples(data, pixels * 3, "RGB")?;
            let img = RgbImage::from_raw(width, height, data)
                .ok_or_else(|| OcrError::ProcessingError("Invalid RGB image data".to_string()))?;
            Ok(DynamicImage::ImageRgb8(img))
        }
        "DeviceCMYK" => {
            let data = truncate_samples(data, pixels * 4, "CMYK")?;
            let mut rgb_data = Vec::with_capacity(pixels * 3);
            for chunk in data.chunks_exact(4) {
                let c = chunk[0] as f32 / 255.0;
                let m = chunk[1] as f32 / 255.0;
                let y = chunk[2] as f32 / 255.0;
                let k = chunk[3] as f32 / 255.0;
                rgb_data.push(((1.0 - c) * (1.0 - k) * 255.0) as u8);
                rgb_data.push(((1.0 - m) * (1.0 - k) * 255.0) as u8);
                rgb_data.push(((1.0 - y) * (1.0 - k) * 255.0) as u8);
            }
            let img = RgbImage::from_raw(width, height, rgb_data).ok_or_else(|| {
                OcrError::ProcessingError("Invalid CMYK->RGB conversion".to_string())
            })?;
            Ok(DynamicImage::ImageRgb8(img))
        }
        other => Err(OcrError::ProcessingError(format!(
            "Unsupported color space: {}",
            other
        ))),
    }
}

fn dimension(stream: &Stream, key: &[u8]) -> Result<u32, OcrError> {
    stream
        .dict
        .get(key)
        .ok()
        .and_then(|v| v.as_i64().ok())
        .filter(|v| *v > 0)
        .map(|v| v as u32)
        .ok_or_else(|| {
            OcrError::ProcessingError(format!(
                "Missing image {}",
                String::from_utf8_lossy(key).to_lowercase()
            ))
        })
}

fn truncate_samples(mut data: Vec<u8>, expected: usize, kind: &str) -> Result<Vec<u8>, OcrError> {
    if data.len() < expected {
        return Err(OcrError::ProcessingError(format!(
            "Truncated {} image data: {} of {} bytes",
            kind,
            data.len(),
            expected
        )));
    }
    data.truncate(expected);
    Ok(data)
}

/// Expand 1-bit rows (padded to whole bytes) into 8-bit grayscale
fn unpack_bilevel(data: &[u8], width: u32, height: u32, inverted: bool) -> Result<GrayImage, OcrError> {
    let row_bytes = (width as usize).div_ceil(8);
    if data.len() < row_bytes * height as usize {
        return Err(OcrError::ProcessingError(format!(
            "Truncated 1-bit image data: {} of {} bytes",
            data.len(),
            row_bytes * height as usize
        )));
    }

    Ok(GrayImage::from_fn(width, height, |x, y| {
        let byte = data[y as usize * row_bytes + x as usize / 8];
        let bit = (byte >> (7 - (x % 8))) & 1;
        let white = (bit == 1) != inverted;
        Luma([if white { 255 } else { 0 }])
    }))
}

/// Get the color space name from a PDF stream
fn color_space(doc: &Document, stream: &Stream) -> String {
    let Some(cs_obj) = stream.dict.get(b"ColorSpace").ok().and_then(|o| resolve(doc, o)) else {
        return "DeviceRGB".to_string();
    };

    if let Ok(name) = cs_obj.as_name() {
        return String::from_utf8_lossy(name).to_string();
    }

    // Array color spaces such as [/ICCBased 5 0 R]
    let Ok(arr) = cs_obj.as_array() else {
        return "DeviceRGB".to_string();
    };
    match arr.first().and_then(|first| first.as_name().ok()) {
        Some(b"ICCBased") => icc_color_space(doc, arr.get(1)).to_string(),
        Some(name) => String::from_utf8_lossy(name).to_string(),
        None => "DeviceRGB".to_string(),
    }
}

/// Device color space matching the component count `/N` of an ICC profile
fn icc_color_space(doc: &Document, profile: Option<&Object>) -> &'static str {
    let components = profile
        .and_then(|p| resolve(doc, p))
        .and_then(|p| p.as_stream().ok())
        .and_then(|p| p.dict.get(b"N").ok())
        .and_then(|n| n.as_i64().ok());
    match components {
        Some(1) => "DeviceGray",
        Some(4) => "DeviceCMYK",
        _ => "DeviceRGB",
    }
}
