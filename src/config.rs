use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Directory under the working directory holding converted books and summaries.
pub const BOOKS_DIR: &str = "books";

/// Default prompt template file, relative to the working directory.
pub const PROMPT_FILE: &str = "prompt.txt";

/// Environment variable carrying the API credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable selecting the completion model.
pub const MODEL_ENV: &str = "MODEL";

/// Environment variable overriding the API base URL.
pub const API_BASE_ENV: &str = "OPENAI_BASE_URL";

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

pub const DEFAULT_CHUNK_TOKENS: usize = 10_000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Settings for the completion provider.
#[derive(Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub model: String,
    /// Base URL of an OpenAI-compatible API, without trailing slash
    pub api_base: String,
    pub temperature: f32,
}

impl ProviderConfig {
    /// Both the credential and the model are required.
    pub fn new(
        api_key: Option<String>,
        model: Option<String>,
        api_base: impl Into<String>,
    ) -> Result<Self> {
        let api_key = required(api_key, API_KEY_ENV)?;
        let model = required(model, MODEL_ENV)?;
        let api_base = api_base.into().trim_end_matches('/').to_string();

        Ok(Self {
            api_key,
            model,
            api_base,
            temperature: 0.0,
        })
    }
}

fn required(value: Option<String>, env: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::config(format!("{env} is not set")))
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Chunk sizing for chapter bodies, in tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::config("chunk size must be positive"));
        }
        if chunk_overlap > chunk_size {
            return Err(Error::config(format!(
                "chunk overlap ({chunk_overlap}) is larger than chunk size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_TOKENS,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Where the summarization driver reads and writes.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Summaries go to `<books_root>/<book name>/`
    pub books_root: PathBuf,
    pub prompt_path: PathBuf,
    pub chunking: ChunkConfig,
}

impl DriverConfig {
    pub fn new(books_root: impl Into<PathBuf>, prompt_path: impl Into<PathBuf>) -> Self {
        Self {
            books_root: books_root.into(),
            prompt_path: prompt_path.into(),
            chunking: ChunkConfig::default(),
        }
    }
}
