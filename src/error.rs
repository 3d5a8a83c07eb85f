use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Failed to initialize OCR engine: {0}")]
    InitializationError(String),

    #[error("Failed to process image: {0}")]
    ProcessingError(String),

    #[error("Preprocessing failed: {0}")]
    PreprocessingError(String),

    #[error("Failed to load corpus {path}: {reason}")]
    CorpusError { path: String, reason: String },

    #[error("Failed to load dictionary {path}: {reason}")]
    DictionaryError { path: String, reason: String },

    #[error("Grammar tool failed: {0}")]
    GrammarError(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcrError {
    pub fn corpus(path: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        OcrError::CorpusError {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn dictionary(path: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        OcrError::DictionaryError {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }
}
