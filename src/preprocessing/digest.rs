use image::GrayImage;
use sha2::{Digest, Sha256};
use std::fmt;

/// Content fingerprint of a normalized page image.
///
/// Hashes the dimensions and raw 8-bit luma samples, so two images with the
/// same normalized pixels always share a digest regardless of how they were
/// originally encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDigest([u8; 32]);

impl ImageDigest {
    pub fn of(image: &GrayImage) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"L8");
        hasher.update(image.width().to_le_bytes());
        hasher.update(image.height().to_le_bytes());
        hasher.update(image.as_raw());
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ImageDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
