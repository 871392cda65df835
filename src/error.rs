use std::path::PathBuf;

/// Everything that can abort a conversion, a listing or a summarization run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The e-book container could not be opened or one of its items read.
    #[error("failed to parse container {path:?}: {message}")]
    ContainerParse { path: PathBuf, message: String },

    /// Content that must be UTF-8 is not.
    #[error("{item} is not valid UTF-8: {source}")]
    Encoding {
        item: String,
        source: std::string::FromUtf8Error,
    },

    /// The prompt template is missing or unreadable.
    #[error("prompt template not found at {path:?}: {source}")]
    MissingPrompt {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The summarization provider failed (transport, status or payload).
    #[error("summarization provider error: {0}")]
    Provider(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Filesystem {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Missing or invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Writing live output or reading the confirmation answer failed.
    #[error("terminal I/O error: {0}")]
    Terminal(#[source] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn container(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::ContainerParse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn encoding(item: impl Into<String>, source: std::string::FromUtf8Error) -> Self {
        Self::Encoding {
            item: item.into(),
            source,
        }
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap a `std::io::Error` with the path it happened at.
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn terminal(source: std::io::Error) -> Self {
        Self::Terminal(source)
    }
}
