use crate::error::Result;

/// What a container item holds, derived from its media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// An (X)HTML content document
    Document,
    Image,
    Style,
    Font,
    Other,
}

impl ItemKind {
    pub fn from_media_type(media_type: &str) -> Self {
        let media_type = media_type.trim().to_ascii_lowercase();
        match media_type.as_str() {
            "application/xhtml+xml" | "text/html" => ItemKind::Document,
            "text/css" => ItemKind::Style,
            t if t.starts_with("image/") => ItemKind::Image,
            t if t.starts_with("font/")
                || t.starts_with("application/font")
                || t == "application/vnd.ms-opentype"
                || t == "application/x-font-ttf" =>
            {
                ItemKind::Font
            }
            _ => ItemKind::Other,
        }
    }
}

/// One addressable unit of a container, in enumeration order
pub struct DocumentItem {
    /// Path of the item inside the container
    pub href: String,
    pub kind: ItemKind,
    /// Raw, undecoded content
    pub content: Vec<u8>,
}

impl DocumentItem {
    pub fn is_document(&self) -> bool {
        self.kind == ItemKind::Document
    }
}

/// Trait for enumerating the items of an e-book container
pub trait ContainerReader {
    /// All items of the container, in the container's own order
    fn items(&self) -> Result<Vec<DocumentItem>>;
}
