//! Image result cache
//!
//! Memoizes a backend's result per normalized image digest. Each backend owns
//! one cache. Entries are never evicted or invalidated for the lifetime of the
//! process, so memory grows with the number of distinct pages seen.

use crate::error::OcrError;
use crate::preprocessing::{ImageDigest, NormalizedImage};
use image::GrayImage;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One digest's entry. The slot lock is held while the value is computed so
/// concurrent callers with the same digest wait instead of recomputing.
type Slot<T> = Arc<Mutex<Option<T>>>;

#[derive(Debug)]
pub struct ImageCache<T = String> {
    slots: Mutex<HashMap<ImageDigest, Slot<T>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T> Default for ImageCache<T> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

/// Hit/miss counters for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl<T: Clone> ImageCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `image`, or run `compute` on the
    /// normalized bitmap, store its value and return it.
    ///
    /// Failures are returned to the caller and not cached.
    pub fn get_or_compute<F>(&self, image: &NormalizedImage, compute: F) -> Result<T, OcrError>
    where
        F: FnOnce(&GrayImage) -> Result<T, OcrError>,
    {
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(image.digest).or_default())
        };

        let mut entry = slot.lock();
        if let Some(value) = entry.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Cache hit for digest {}", image.digest);
            return Ok(value.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        match compute(&image.image) {
            Ok(value) => {
                *entry = Some(value.clone());
                Ok(value)
            }
            Err(e) => {
                drop(entry);
                self.discard_empty(&image.digest, &slot);
                Err(e)
            }
        }
    }

    /// Drop a slot left empty by a failed compute, unless another caller is
    /// already waiting on it
    fn discard_empty(&self, digest: &ImageDigest, slot: &Slot<T>) {
        let mut slots = self.slots.lock();
        let unused = slots.get(digest).is_some_and(|current| {
            Arc::ptr_eq(current, slot) && Arc::strong_count(slot) == 2 && current.lock().is_none()
        });
        if unused {
            slots.remove(digest);
        }
    }

    /// Whether a result is stored for `digest`
    pub fn contains(&self, digest: &ImageDigest) -> bool {
        let slot = self.slots.lock().get(digest).cloned();
        slot.is_some_and(|s| s.lock().is_some())
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self
            .slots
            .lock()
            .values()
            .filter(|s| s.lock().is_some())
            .count();
        CacheStats {
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
