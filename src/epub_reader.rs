use crate::error::{Error, Result};
use crate::reader::{ContainerReader, DocumentItem, ItemKind};
use rbook::prelude::*;
use rbook::Epub;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// An EPUB opened through `rbook`, enumerated in spine (reading) order.
pub struct EpubContainer {
    path: PathBuf,
    epub: Epub,
}

impl EpubContainer {
    pub fn open(path: &Path) -> Result<Self> {
        let epub = Epub::options()
            .strict(false)
            .open(path)
            .map_err(|e| Error::container(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            epub,
        })
    }
}

impl ContainerReader for EpubContainer {
    // The manifest iterates in no particular order; the spine is the
    // container's own sequence.
    fn items(&self) -> Result<Vec<DocumentItem>> {
        let mut items = Vec::new();

        for spine_entry in self.epub.spine().entries() {
            let Some(entry) = spine_entry.manifest_entry() else {
                warn!(
                    idref = spine_entry.idref(),
                    "spine entry has no manifest item, skipping"
                );
                continue;
            };

            let href = entry
                .resource()
                .key()
                .value()
                .unwrap_or("unknown")
                .to_string();
            let kind = ItemKind::from_media_type(entry.resource_kind().as_str());

            let content = entry
                .read_bytes()
                .map_err(|e| Error::container(&self.path, format!("{href}: {e}")))?;

            debug!(%href, ?kind, bytes = content.len(), "read container item");
            items.push(DocumentItem {
                href,
                kind,
                content,
            });
        }

        Ok(items)
    }
}
