use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::config::{API_BASE_ENV, API_KEY_ENV, DEFAULT_API_BASE, MODEL_ENV, PROMPT_FILE};

/// Convert an EPUB ebook into a single Markdown file under ./books
#[derive(Parser, Debug)]
#[command(name = "epub2md", version, about)]
pub struct ConvertCli {
    /// Path to the EPUB file to convert
    pub input: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// List and summarize the chapters of a converted Markdown book
#[derive(Parser, Debug)]
#[command(name = "chapters", version, about)]
pub struct ChaptersCli {
    /// List all chapters in the Markdown file
    #[arg(long, value_name = "PATH")]
    pub list_chapters: Option<PathBuf>,

    /// Summarize one or all chapters from the Markdown file
    #[arg(long, value_name = "PATH")]
    pub summarize: Option<PathBuf>,

    /// Number of the specific chapter to summarize
    #[arg(long, value_name = "N")]
    pub chapter: Option<NonZeroUsize>,

    /// System prompt template used for every summary
    #[arg(long, value_name = "PATH", default_value = PROMPT_FILE)]
    pub prompt: PathBuf,

    /// API key for the completion service
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Completion model, also selects the tokenizer used for chunking
    #[arg(long, env = MODEL_ENV)]
    pub model: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = API_BASE_ENV, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Load `.env` from the working directory or one of its parents. Variables
/// already set in the environment win. Returns the file loaded, if any.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Log to stderr; stdout carries the program's output.
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match verbose {
        0 => "book_digest=warn",
        1 => "book_digest=info",
        2 => "book_digest=debug",
        _ => "book_digest=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
