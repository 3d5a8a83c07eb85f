//! OCR fallback cascade with domain-aware text correction
//!
//! Scanned PDF pages are recognized by a fixed-order cascade of OCR backends,
//! each with its own image cache. The winning backend's text is repaired by
//! its correction engine, which protects domain vocabulary, fixes spelling
//! with case preservation and runs a grammar pass.

pub mod backend;
pub mod cache;
pub mod cascade;
pub mod config;
pub mod correction;
pub mod engine;
pub mod engines;
pub mod error;
pub mod grammar;
pub mod patterns;
pub mod preprocessing;
pub mod rasterize;
pub mod service;
pub mod similarity;
pub mod spelling;
pub mod vocabulary;

pub use backend::{OcrBackend, Recognized};
pub use cascade::{Cascade, DocumentResult, DomainSelection, PageResult};
pub use config::Config;
pub use engine::Recognizer;
pub use error::OcrError;
pub use grammar::GrammarTool;
