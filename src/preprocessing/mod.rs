//! Image normalization for recognition and caching
//!
//! Every page image is reduced to a binarized grayscale bitmap before it is
//! digested or handed to a recognizer, so identical renders share a cache key.

pub mod digest;
pub mod pipeline;
pub mod steps;

pub use digest::ImageDigest;
pub use pipeline::{NormalizedImage, Pipeline, StepTiming};
