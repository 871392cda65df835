use std::sync::LazyLock;

use regex::Regex;

static HEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<head\b.*?</head\s*>").expect("valid regex"));
static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:img|image)\b[^>]*>(?:\s*</image\s*>)?").expect("valid regex")
});
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)</?a\b[^>]*>").expect("valid regex"));
static TABLE_FRAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)</?(?:table|thead|tbody|tfoot|colgroup|col|caption)\b[^>]*>")
        .expect("valid regex")
});
static ROW_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)</tr\s*>").expect("valid regex"));
static ROW_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr\b[^>]*>").expect("valid regex"));
static CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)</?t[hd]\b[^>]*>").expect("valid regex"));

/// Convert one content document with the fixed book settings: links keep
/// only their text, images are dropped, tables become plain text rows and
/// paragraphs are separated by a single newline.
pub fn html_to_markdown(html: &str) -> String {
    let html = prepare_html(html);
    let md = html2md::parse_html(&html, false);
    clean_markdown(&collapse_blank_lines(&md))
}

/// Remove the markup the output must not contain.
pub fn prepare_html(html: &str) -> String {
    let html = HEAD_RE.replace_all(html, "");
    let html = IMAGE_RE.replace_all(&html, "");
    let html = LINK_RE.replace_all(&html, "");
    let html = TABLE_FRAME_RE.replace_all(&html, "");
    let html = ROW_START_RE.replace_all(&html, "");
    let html = ROW_END_RE.replace_all(&html, "<br/>");
    CELL_RE.replace_all(&html, " ").into_owned()
}

/// Length of the `#` run at the very start of a block, if any.
pub fn leading_heading_depth(md: &str) -> Option<usize> {
    let depth = md.bytes().take_while(|b| *b == b'#').count();
    (depth > 0).then_some(depth)
}

fn is_fence(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with("```") || t.starts_with("~~~")
}

/// Drop blank lines outside fenced code so paragraphs break on one newline.
fn collapse_blank_lines(md: &str) -> String {
    let mut in_fence = false;
    md.lines()
        .filter(|line| {
            if is_fence(line) {
                in_fence = !in_fence;
                return true;
            }
            in_fence || !line.trim().is_empty()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn clean_markdown(md: &str) -> String {
    // Trim trailing whitespace per line
    let result = md
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");

    // Leading blank lines would hide the heading depth
    let trimmed = result.trim_start_matches(['\n', '\r']).trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}
