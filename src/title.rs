/// Short words kept lower-case inside a display title.
pub const LOWERCASE_WORDS: &[&str] = &[
    "in", "with", "the", "a", "an", "and", "but", "or", "nor", "for", "on", "at", "to", "by",
    "from", "of", "not",
];

/// Human-facing form of a chapter title.
///
/// Underscores and spaces become single spaces. Every word is capitalized
/// (first letter upper, rest lower) except [`LOWERCASE_WORDS`], which stay
/// lower-case unless they open the title.
pub fn display_title(title: &str) -> String {
    title
        .split(['_', ' '])
        .filter(|word| !word.is_empty())
        .enumerate()
        .map(|(i, word)| {
            let lower = word.to_lowercase();
            if i > 0 && LOWERCASE_WORDS.contains(&lower.as_str()) {
                lower
            } else {
                capitalize(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// `Chapter_<n>_<Display_Title>.md`. Path separators in the title are
/// replaced so the file always lands in the book directory.
pub fn chapter_file_name(number: usize, display_title: &str) -> String {
    let stem: String = display_title
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    format!("Chapter_{number}_{stem}.md")
}
