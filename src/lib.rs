//! Convert EPUB books to Markdown and summarize them chapter by chapter.

pub mod chapters;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod converter;
pub mod epub_reader;
pub mod error;
pub mod markdown;
pub mod metadata;
pub mod provider;
pub mod reader;
pub mod summarize;
pub mod title;

pub use chapters::{extract_chapters, Chapter};
pub use config::{ChunkConfig, DriverConfig, ProviderConfig};
pub use error::{Error, Result};
pub use provider::{OpenAiProvider, SummaryProvider, TokenStream};
pub use summarize::{ContinuePrompt, Driver, StdinPrompt};
