use crate::cascade::DomainSelection;
use crate::engines::vision;
use crate::vocabulary::DEFAULT_TEXT_COLUMNS;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DATASET: &str = "/app/datasets/dataset.json";
pub const DEFAULT_FREQUENCY_DICT: &str = "/app/symspell_dicts/frequency_dictionary_en_82765.txt";
pub const DEFAULT_BIGRAM_DICT: &str = "/app/symspell_dicts/bigram_dictionary_en_243342.txt";

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Labeled `{label, text}` corpus
    pub dataset: PathBuf,
    /// Free-text corpora as (domain, path)
    pub corpora: Vec<(String, PathBuf)>,
    pub corpus_columns: Vec<String>,
    pub frequency_dict: PathBuf,
    pub bigram_dict: PathBuf,
    /// Word list for the dictionary-lookup backends
    pub spell_dict: PathBuf,
    pub vision_api_key: Option<String>,
    pub vision_endpoint: String,
    pub vision_timeout: Duration,
    pub tessdata_path: Option<String>,
    pub language: String,
    pub grammar_url: Option<String>,
    pub grammar_language: String,
    pub grammar_timeout: Duration,
    pub domain: DomainSelection,
    pub dpi: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from(DEFAULT_DATASET),
            corpora: Vec::new(),
            corpus_columns: DEFAULT_TEXT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            frequency_dict: PathBuf::from(DEFAULT_FREQUENCY_DICT),
            bigram_dict: PathBuf::from(DEFAULT_BIGRAM_DICT),
            spell_dict: PathBuf::from(DEFAULT_FREQUENCY_DICT),
            vision_api_key: None,
            vision_endpoint: vision::DEFAULT_ENDPOINT.to_string(),
            vision_timeout: Duration::from_secs(30),
            tessdata_path: None,
            language: "eng".to_string(),
            grammar_url: None,
            grammar_language: "en-US".to_string(),
            grammar_timeout: Duration::from_secs(30),
            domain: DomainSelection::None,
            dpi: 150,
        }
    }
}
