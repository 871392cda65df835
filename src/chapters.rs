use crate::error::{Error, Result};
use crate::metadata::SourceMetadata;
use std::fs;
use std::path::Path;
use tracing::{debug, instrument};

/// Title prefixes (lower-case) of sections that are never chapters.
pub const EXCLUDED_TITLE_PREFIXES: &[&str] = &[
    "table of contents",
    "contents",
    "guide",
    "dedication",
    "preface",
    "acknowledgments",
    "outline",
    "revision",
    "who should read",
    "references",
    "o’reilly",
    "how to contact us",
];

/// Headings active at a point of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headings {
    pub h1: Option<String>,
    pub h2: Option<String>,
}

impl Headings {
    /// Level 1 heading if one is active (even an empty one), else level 2.
    pub fn title(&self) -> &str {
        self.h1
            .as_deref()
            .or(self.h2.as_deref())
            .unwrap_or_default()
            .trim()
    }

    fn enter(&mut self, level: usize, text: String) {
        if level == 1 {
            self.h1 = Some(text);
            self.h2 = None;
        } else {
            self.h2 = Some(text);
        }
    }
}

/// A run of body text under one set of headings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub content: String,
    pub headings: Headings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// Trimmed heading text as found in the document
    pub title: String,
    pub body: String,
    pub source: SourceMetadata,
}

pub fn should_include_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    !EXCLUDED_TITLE_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Read `path` and extract its chapters in first-occurrence order.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn extract_chapters(path: &Path) -> Result<Vec<Chapter>> {
    let source = SourceMetadata::capture(path)?;
    let bytes = fs::read(path).map_err(|e| Error::fs(path, e))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| Error::encoding(path.display().to_string(), e))?;

    let chapters = chapters_from_text(&text, &source);
    debug!(chapters = chapters.len(), "extracted chapters");
    Ok(chapters)
}

/// Group the sections of `text` into chapters.
pub fn chapters_from_text(text: &str, source: &SourceMetadata) -> Vec<Chapter> {
    let mut chapters: Vec<Chapter> = Vec::new();

    for section in split_sections(text) {
        let title = section.headings.title();
        if title.is_empty() || !should_include_title(title) {
            continue;
        }

        match chapters.iter_mut().find(|c| c.title == title) {
            Some(existing) => {
                existing.body.push_str("\n\n");
                existing.body.push_str(&section.content);
            }
            None => chapters.push(Chapter {
                title: title.to_string(),
                body: section.content,
                source: source.clone(),
            }),
        }
    }

    chapters
}

/// Split markdown at level 1 and 2 headings.
///
/// Lines are trimmed and stripped of non-printable characters. Heading lines
/// are not kept in any section. Outside fenced code, a blank line ends the
/// current run; consecutive runs under identical headings are joined with a
/// hard line break (`"  \n"`).
pub fn split_sections(text: &str) -> Vec<Section> {
    let mut runs: Vec<Section> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut active = Headings::default();
    let mut snapshot = Headings::default();
    let mut fence: Option<&'static str> = None;

    for raw in text.split('\n') {
        let line = printable(raw.trim());

        match fence {
            None => {
                if line.starts_with("```") && line.matches("```").count() == 1 {
                    fence = Some("```");
                } else if line.starts_with("~~~") {
                    fence = Some("~~~");
                }
            }
            Some(marker) => {
                if line.starts_with(marker) {
                    fence = None;
                }
            }
        }
        if fence.is_some() {
            current.push(line);
            continue;
        }

        if let Some((level, heading)) = parse_heading(&line) {
            active.enter(level, heading);
            flush(&mut runs, &mut current, &snapshot);
        } else if !line.is_empty() {
            current.push(line);
        } else {
            flush(&mut runs, &mut current, &snapshot);
        }

        snapshot = active.clone();
    }
    flush(&mut runs, &mut current, &snapshot);

    aggregate(runs)
}

fn flush(runs: &mut Vec<Section>, current: &mut Vec<String>, headings: &Headings) {
    if current.is_empty() {
        return;
    }
    runs.push(Section {
        content: current.join("\n"),
        headings: headings.clone(),
    });
    current.clear();
}

fn aggregate(runs: Vec<Section>) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    for run in runs {
        match sections.last_mut() {
            Some(last) if last.headings == run.headings => {
                last.content.push_str("  \n");
                last.content.push_str(&run.content);
            }
            _ => sections.push(run),
        }
    }
    sections
}

/// `#` or `##` followed by a space or the end of the line.
fn parse_heading(line: &str) -> Option<(usize, String)> {
    for (marker, level) in [("##", 2), ("#", 1)] {
        if let Some(rest) = line.strip_prefix(marker) {
            if rest.is_empty() || rest.starts_with(' ') {
                return Some((level, rest.trim().to_string()));
            }
        }
    }
    None
}

/// Keep the characters Python's `str.isprintable` accepts. Control, format,
/// private-use and separator characters (other than the ASCII space) are
/// removed. Unassigned code points are approximated by the noncharacters and
/// the wholly unassigned planes 4 to 13.
fn printable(line: &str) -> String {
    line.chars()
        .filter(|&c| c == ' ' || !(c.is_control() || c.is_whitespace() || is_hidden(c)))
        .collect()
}

fn is_hidden(c: char) -> bool {
    is_format_char(c) || is_private_use(c) || is_unassigned(c)
}

fn is_format_char(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{0600}'..='\u{0605}'
            | '\u{061C}'
            | '\u{06DD}'
            | '\u{070F}'
            | '\u{0890}'..='\u{0891}'
            | '\u{08E2}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
            | '\u{110BD}'
            | '\u{110CD}'
            | '\u{13430}'..='\u{1343F}'
            | '\u{1BCA0}'..='\u{1BCA3}'
            | '\u{1D173}'..='\u{1D17A}'
            | '\u{E0001}'
            | '\u{E0020}'..='\u{E007F}'
    )
}

fn is_private_use(c: char) -> bool {
    matches!(
        c,
        '\u{E000}'..='\u{F8FF}' | '\u{F0000}'..='\u{FFFFD}' | '\u{100000}'..='\u{10FFFD}'
    )
}

fn is_unassigned(c: char) -> bool {
    let cp = u32::from(c);
    (0xFDD0..=0xFDEF).contains(&cp) || cp & 0xFFFE == 0xFFFE || (0x40000..=0xDFFFF).contains(&cp)
}
