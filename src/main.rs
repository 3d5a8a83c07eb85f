use anyhow::Context;
use clap::{Parser, Subcommand};
use ocr_cascade::cascade::{DocumentResult, DomainSelection};
use ocr_cascade::config::{Config, DEFAULT_BIGRAM_DICT, DEFAULT_DATASET, DEFAULT_FREQUENCY_DICT};
use ocr_cascade::engines::vision;
use ocr_cascade::service;
use ocr_cascade::similarity::levenshtein_accuracy;
use ocr_cascade::vocabulary::{self, DEFAULT_TEXT_COLUMNS};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "ocr-cascade")]
#[command(about = "OCR fallback cascade with domain-aware text correction")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Labeled corpus (JSON array of {label, text})
    #[arg(long, env = "OCR_DATASET", default_value = DEFAULT_DATASET, global = true)]
    pub dataset: PathBuf,

    /// Free-text corpus as NAME=PATH (repeatable)
    #[arg(long = "corpus", value_parser = parse_corpus, global = true)]
    pub corpora: Vec<(String, PathBuf)>,

    /// Text columns read from free-text corpus records
    #[arg(long, value_delimiter = ',', global = true)]
    pub corpus_columns: Vec<String>,

    /// Unigram frequency dictionary for edit-distance correction
    #[arg(long, env = "SYMSPELL_FREQ_DICT", default_value = DEFAULT_FREQUENCY_DICT, global = true)]
    pub frequency_dict: PathBuf,

    /// Bigram frequency dictionary for edit-distance correction
    #[arg(long, env = "SYMSPELL_BIGRAM_DICT", default_value = DEFAULT_BIGRAM_DICT, global = true)]
    pub bigram_dict: PathBuf,

    /// Word frequency list for dictionary correction (defaults to --frequency-dict)
    #[arg(long, env = "OCR_SPELL_DICT", global = true)]
    pub spell_dict: Option<PathBuf>,

    /// Google Cloud Vision API key; the cloud backend is skipped without one
    #[arg(long, env = "GOOGLE_VISION_API_KEY", hide_env_values = true, global = true)]
    pub vision_api_key: Option<String>,

    /// Google Cloud Vision annotate endpoint
    #[arg(long, default_value = vision::DEFAULT_ENDPOINT, global = true)]
    pub vision_endpoint: String,

    /// Timeout for each cloud recognition call, in seconds
    #[arg(long, default_value = "30", global = true)]
    pub vision_timeout_secs: u64,

    /// Path to tessdata directory (uses TESSDATA_PREFIX env var if not set)
    #[arg(long, env = "TESSDATA_PREFIX", global = true)]
    pub tessdata_path: Option<String>,

    /// Language for Tesseract (e.g., "eng", "deu", "fra")
    #[arg(long, default_value = "eng", global = true)]
    pub language: String,

    /// LanguageTool server URL; grammar correction is disabled without one
    #[arg(long, env = "LANGUAGE_TOOL_URL", global = true)]
    pub grammar_url: Option<String>,

    /// LanguageTool language code
    #[arg(long, default_value = "en-US", global = true)]
    pub grammar_language: String,

    /// Domain patterns applied to corrected text: none, auto, or a label
    #[arg(long, default_value = "none", global = true)]
    pub domain: DomainSelection,

    /// Resolution for pages without an embedded image
    #[arg(long, default_value = "150", global = true)]
    pub dpi: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract and correct the text of a scanned PDF
    Process {
        pdf: PathBuf,

        /// Write the JSON result here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Score a text file against every domain vocabulary
    Score { text_file: PathBuf },
    /// Similarity of a predicted text file to a ground truth file
    Accuracy { predicted: PathBuf, truth: PathBuf },
}

fn parse_corpus(value: &str) -> Result<(String, PathBuf), String> {
    let (name, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PATH, got '{}'", value))?;
    if name.is_empty() || path.is_empty() {
        return Err(format!("expected NAME=PATH, got '{}'", value));
    }
    Ok((name.to_string(), PathBuf::from(path)))
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        let corpus_columns = if args.corpus_columns.is_empty() {
            DEFAULT_TEXT_COLUMNS.iter().map(|c| c.to_string()).collect()
        } else {
            args.corpus_columns.clone()
        };
        Self {
            dataset: args.dataset.clone(),
            corpora: args.corpora.clone(),
            corpus_columns,
            frequency_dict: args.frequency_dict.clone(),
            bigram_dict: args.bigram_dict.clone(),
            spell_dict: args
                .spell_dict
                .clone()
                .unwrap_or_else(|| args.frequency_dict.clone()),
            vision_api_key: args.vision_api_key.clone().filter(|k| !k.trim().is_empty()),
            vision_endpoint: args.vision_endpoint.clone(),
            vision_timeout: Duration::from_secs(args.vision_timeout_secs),
            tessdata_path: args.tessdata_path.clone(),
            language: args.language.clone(),
            grammar_url: args.grammar_url.clone(),
            grammar_language: args.grammar_language.clone(),
            domain: args.domain.clone(),
            dpi: args.dpi,
            ..Config::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing; logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from(&args);

    match &args.command {
        Command::Process { pdf, output } => {
            tracing::info!("Starting ocr-cascade v{}", env!("CARGO_PKG_VERSION"));
            let cascade = service::build_cascade(&config);
            let pages = cascade.process(pdf);
            if pages.is_empty() {
                tracing::warn!("No pages processed for {:?}", pdf);
            }

            let document = DocumentResult::from_pages(pages);
            let json = serde_json::to_string_pretty(&document)?;
            match output {
                Some(path) => std::fs::write(path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", json),
            }
        }
        Command::Score { text_file } => {
            let text = std::fs::read_to_string(text_file)
                .with_context(|| format!("Failed to read {}", text_file.display()))?;
            let vocabulary = service::load_vocabulary(&config);
            let scores = vocabulary::score(&text, &vocabulary);
            println!("{}", serde_json::to_string_pretty(&scores)?);
        }
        Command::Accuracy { predicted, truth } => {
            let predicted = std::fs::read_to_string(predicted)
                .with_context(|| format!("Failed to read {}", predicted.display()))?;
            let truth = std::fs::read_to_string(truth)
                .with_context(|| format!("Failed to read {}", truth.display()))?;
            println!("{:.4}", levenshtein_accuracy(&predicted, &truth));
        }
    }

    Ok(())
}
