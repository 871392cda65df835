use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Where a chapter came from. Shared by every chapter of one extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMetadata {
    /// File name of the markdown source
    pub source: String,
    pub path: PathBuf,
    /// Absent when the platform or filesystem does not record it
    pub created: Option<SystemTime>,
    pub modified: Option<SystemTime>,
    pub accessed: Option<SystemTime>,
}

impl SourceMetadata {
    pub fn capture(path: &Path) -> Result<Self> {
        let stat = fs::metadata(path).map_err(|e| Error::fs(path, e))?;

        Ok(Self {
            source: path
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            created: stat.created().ok(),
            modified: stat.modified().ok(),
            accessed: stat.accessed().ok(),
        })
    }
}
