//! Token-bounded chunking of chapter bodies.
//!
//! Text is cut at the coarsest separator it contains (paragraph, line, word,
//! then character) and the pieces are packed greedily into chunks of at most
//! `chunk_size` tokens, each chunk repeating up to `chunk_overlap` tokens from
//! the end of the previous one. Pieces that are too large on their own are
//! cut again at the next finer separator.

use std::collections::VecDeque;

use tiktoken_rs::CoreBPE;
use tracing::warn;

use crate::config::ChunkConfig;
use crate::error::{Error, Result};

const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Measures text length in model tokens.
pub trait TokenCounter {
    fn count(&self, text: &str) -> usize;
}

/// BPE tokenizer matching the completion model.
pub struct BpeCounter {
    bpe: CoreBPE,
}

impl BpeCounter {
    /// Tokenizer for `model`, or `cl100k_base` when the model is unknown.
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => bpe,
            Err(err) => {
                warn!(model, "no tokenizer for model, using cl100k_base: {err}");
                tiktoken_rs::cl100k_base()
                    .map_err(|e| Error::config(format!("failed to load cl100k_base: {e}")))?
            }
        };
        Ok(Self { bpe })
    }
}

impl TokenCounter for BpeCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Split `text` into overlapping chunks sized by `counter`.
pub fn split_text(text: &str, config: &ChunkConfig, counter: &dyn TokenCounter) -> Vec<String> {
    let splitter = Splitter {
        size: config.chunk_size,
        overlap: config.chunk_overlap,
        counter,
    };
    splitter.split(text, SEPARATORS)
}

struct Splitter<'a> {
    size: usize,
    overlap: usize,
    counter: &'a dyn TokenCounter,
}

impl Splitter<'_> {
    fn split(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, finer) = pick_separator(text, separators);

        let mut chunks = Vec::new();
        let mut small: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if self.counter.count(piece) < self.size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                chunks.extend(self.merge(&small));
                small.clear();
            }
            if finer.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split(piece, finer));
            }
        }

        if !small.is_empty() {
            chunks.extend(self.merge(&small));
        }
        chunks
    }

    /// Pack pieces into chunks, carrying the overlap into the next chunk.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = self.counter.count(piece);

            if total + len > self.size {
                if total > self.size {
                    warn!(tokens = total, limit = self.size, "chunk exceeds the configured size");
                }
                if !window.is_empty() {
                    push_joined(&mut chunks, &window);
                    while total > self.overlap || (total + len > self.size && total > 0) {
                        let Some((_, dropped)) = window.pop_front() else {
                            break;
                        };
                        total -= dropped;
                    }
                }
            }

            window.push_back((piece, len));
            total += len;
        }

        push_joined(&mut chunks, &window);
        chunks
    }
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<(&str, usize)>) {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// First separator present in `text`, plus the finer ones after it.
fn pick_separator<'s>(text: &str, separators: &'s [&'s str]) -> (&'s str, &'s [&'s str]) {
    for (i, &separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return (separator, &[]);
        }
        if text.contains(separator) {
            return (separator, &separators[i + 1..]);
        }
    }
    ("", &[])
}

/// Split on `separator`, attaching each separator to the start of the piece
/// that follows it. An empty separator splits into characters.
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}
