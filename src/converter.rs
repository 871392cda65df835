use crate::epub_reader::EpubContainer;
use crate::error::{Error, Result};
use crate::markdown;
use crate::reader::{ContainerReader, DocumentItem};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Converted text of one document item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownBlock {
    pub text: String,
    /// Length of the leading `#` run, if the block opens with one
    pub depth: Option<usize>,
}

impl MarkdownBlock {
    pub fn new(text: String) -> Self {
        let depth = markdown::leading_heading_depth(&text);
        Self { text, depth }
    }

    /// Only blocks opening with a level 1 or 2 heading make it into the book.
    pub fn is_included(&self) -> bool {
        matches!(self.depth, Some(1 | 2))
    }
}

/// Outcome of one conversion run
#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub output: PathBuf,
    /// Document items seen in the container
    pub documents: usize,
    /// Blocks written to the output
    pub included: usize,
}

/// Convert the EPUB at `input` into `<books_root>/<name>.md`.
pub fn convert(input: &Path, books_root: &Path) -> Result<ConversionReport> {
    let container = EpubContainer::open(input)?;
    convert_container(&container, input, books_root)
}

/// Convert every document item of `reader`, keeping blocks that open with a
/// level 1 or 2 heading, and write them in container order.
///
/// A single item that is not valid UTF-8 aborts the whole run.
#[instrument(skip_all, fields(input = %input.display()))]
pub fn convert_container(
    reader: &dyn ContainerReader,
    input: &Path,
    books_root: &Path,
) -> Result<ConversionReport> {
    let output_path = resolve_output_path(input, books_root)?;

    let mut blocks = Vec::new();
    for item in reader.items()? {
        if !item.is_document() {
            continue;
        }
        let DocumentItem { href, content, .. } = item;
        let html = String::from_utf8(content).map_err(|e| Error::encoding(&href, e))?;

        let block = MarkdownBlock::new(markdown::html_to_markdown(&html));
        debug!(%href, depth = ?block.depth, included = block.is_included(), "converted document");
        blocks.push(block);
    }

    let documents = blocks.len();
    let (content, included) = assemble(blocks);

    write_output(&output_path, &content)?;

    info!(
        documents,
        included,
        output = %output_path.display(),
        "conversion complete"
    );

    Ok(ConversionReport {
        output: output_path,
        documents,
        included,
    })
}

/// Concatenate the included blocks in order. Returns the text and how many
/// blocks went into it.
pub fn assemble(blocks: impl IntoIterator<Item = MarkdownBlock>) -> (String, usize) {
    let mut content = String::new();
    let mut included = 0;

    for block in blocks.into_iter().filter(MarkdownBlock::is_included) {
        content.push_str(&block.text);
        included += 1;
    }

    (content, included)
}

/// `<books_root>/<file stem with spaces as underscores>.md`
pub fn resolve_output_path(input: &Path, books_root: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| Error::container(input, "input file has no name"))?
        .to_string_lossy();

    Ok(books_root.join(format!("{}.md", stem.replace(' ', "_"))))
}

fn write_output(output_path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::fs(parent, e))?;
        }
    }

    fs::write(output_path, content).map_err(|e| Error::fs(output_path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ItemKind;

    struct FakeContainer(Vec<(&'static str, ItemKind, Vec<u8>)>);

    impl ContainerReader for FakeContainer {
        fn items(&self) -> Result<Vec<DocumentItem>> {
            Ok(self
                .0
                .iter()
                .map(|(href, kind, content)| DocumentItem {
                    href: href.to_string(),
                    kind: *kind,
                    content: content.clone(),
                })
                .collect())
        }
    }

    fn doc(href: &'static str, html: &str) -> (&'static str, ItemKind, Vec<u8>) {
        (href, ItemKind::Document, html.as_bytes().to_vec())
    }

    #[test]
    fn assemble_keeps_depth_one_and_two_in_order() {
        let blocks = vec![
            MarkdownBlock::new("## Second level\nb\n".into()),
            MarkdownBlock::new("Cover text\n".into()),
            MarkdownBlock::new("### Too deep\nc\n".into()),
            MarkdownBlock::new("# First level\na\n".into()),
            MarkdownBlock::new(String::new()),
        ];

        let (content, included) = assemble(blocks);
        assert_eq!(included, 2);
        assert_eq!(content, "## Second level\nb\n# First level\na\n");
    }

    #[test]
    fn output_name_replaces_spaces() {
        let path = resolve_output_path(Path::new("/tmp/My Great Book.epub"), Path::new("books"))
            .unwrap();
        assert_eq!(path, PathBuf::from("books/My_Great_Book.md"));
    }

    #[test]
    fn converts_only_heading_documents() {
        let dir = tempfile::tempdir().unwrap();
        let books = dir.path().join("books");
        let container = FakeContainer(vec![
            doc("cover.xhtml", "<html><body><p>Cover</p></body></html>"),
            doc("ch1.xhtml", "<html><body><h1>Chapter One</h1><p>Alpha</p></body></html>"),
            ("style.css", ItemKind::Style, b"h1 { color: red }".to_vec()),
            doc("ch1a.xhtml", "<html><body><h3>Aside</h3><p>Gamma</p></body></html>"),
            doc("ch2.xhtml", "<html><body><h2>Chapter Two</h2><p>Beta</p></body></html>"),
        ]);

        let report = convert_container(&container, Path::new("Some Book.epub"), &books).unwrap();

        assert_eq!(report.output, books.join("Some_Book.md"));
        assert_eq!(report.documents, 4);
        assert_eq!(report.included, 2);

        let written = fs::read_to_string(&report.output).unwrap();
        let one = written.find("# Chapter One").unwrap();
        let two = written.find("## Chapter Two").unwrap();
        assert!(one < two);
        assert!(written.contains("Alpha"));
        assert!(written.contains("Beta"));
        assert!(!written.contains("Cover"));
        assert!(!written.contains("Gamma"));
        assert!(!written.contains("color"));
    }

    #[test]
    fn conversion_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let books = dir.path().join("books");
        let container = FakeContainer(vec![
            doc("a.xhtml", "<h1>One</h1><p>First <em>emphasis</em></p>"),
            doc("b.xhtml", "<h2>Two</h2><ul><li>x</li><li>y</li></ul>"),
        ]);

        let first = convert_container(&container, Path::new("b.epub"), &books).unwrap();
        let a = fs::read(&first.output).unwrap();
        let second = convert_container(&container, Path::new("b.epub"), &books).unwrap();
        let b = fs::read(&second.output).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn invalid_utf8_aborts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let books = dir.path().join("books");
        let container = FakeContainer(vec![
            doc("ch1.xhtml", "<h1>Fine</h1>"),
            ("ch2.xhtml", ItemKind::Document, vec![b'<', b'p', b'>', 0xff, 0xfe]),
        ]);

        let err = convert_container(&container, Path::new("bad.epub"), &books).unwrap_err();

        match err {
            Error::Encoding { item, .. } => assert_eq!(item, "ch2.xhtml"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!books.join("bad.md").exists());
    }

    #[test]
    fn non_utf8_images_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let books = dir.path().join("books");
        let container = FakeContainer(vec![
            ("cover.jpg", ItemKind::Image, vec![0xff, 0xd8, 0xff]),
            doc("ch1.xhtml", "<h1>Only</h1><p>text</p>"),
        ]);

        let report = convert_container(&container, Path::new("img.epub"), &books).unwrap();
        assert_eq!(report.included, 1);
    }

    #[test]
    fn scene_breaks_do_not_cut_chapter_text() {
        let dir = tempfile::tempdir().unwrap();
        let books = dir.path().join("books");
        let container = FakeContainer(vec![doc(
            "ch1.xhtml",
            "<h1>Story</h1><p>The night fell.</p><hr/><p>Morning came.</p>",
        )]);

        let report = convert_container(&container, Path::new("story.epub"), &books).unwrap();
        let chapters = crate::chapters::extract_chapters(&report.output).unwrap();

        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, "Story");
        assert!(chapters[0].body.contains("The night fell."));
        assert!(chapters[0].body.contains("Morning came."));
    }
}
