//! Recursive text chunking with a fixed character overlap.
//!
//! Text is first cut at the largest natural boundary that yields pieces no
//! longer than `chunk_size - chunk_overlap` characters (paragraph, line,
//! sentence, word), falling back to hard cuts. Pieces are then packed into
//! windows, and every window after the first is prefixed with the last
//! `chunk_overlap` characters of its predecessor. Dropping that prefix from
//! every chunk but the first gives back the original text exactly.

use crate::document_processor::LoadedDocument;
use legal_rag_common::{Chunk, ChunkMetadata, RagConfig, RagError, Result};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
enum Boundary {
    Paragraph,
    Line,
    Sentence,
    Word,
}

const BOUNDARIES: [Boundary; 4] = [
    Boundary::Paragraph,
    Boundary::Line,
    Boundary::Sentence,
    Boundary::Word,
];

impl Boundary {
    /// Split keeping each delimiter attached to the piece before it.
    fn split(self, text: &str) -> Vec<&str> {
        match self {
            Boundary::Paragraph => text.split_inclusive("\n\n").collect(),
            Boundary::Line => text.split_inclusive('\n').collect(),
            Boundary::Sentence => split_sentences(text),
            Boundary::Word => text.split_inclusive(char::is_whitespace).collect(),
        }
    }
}

/// A chunk of text and the character offset it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub char_offset: usize,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(RagError::Configuration(format!(
                "invalid chunking parameters: size {}, overlap {}",
                chunk_size, chunk_overlap
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split one text. Leading and trailing whitespace is dropped; offsets
    /// refer to the untrimmed input.
    pub fn split_text(&self, text: &str) -> Vec<TextSpan> {
        let leading = text.len() - text.trim_start().len();
        let base_offset = text[..leading].chars().count();
        let text = text.trim();

        if text.is_empty() {
            return Vec::new();
        }

        if char_len(text) <= self.chunk_size {
            return vec![TextSpan {
                char_offset: base_offset,
                text: text.to_string(),
            }];
        }

        let budget = self.chunk_size - self.chunk_overlap;
        let mut pieces = Vec::new();
        split_recursive(text, budget, &BOUNDARIES, &mut pieces);

        // Byte ranges of the new content carried by each window.
        let mut windows: Vec<(usize, usize)> = Vec::new();
        let mut start = 0;
        let mut end = 0;
        let mut len = 0;
        let mut capacity = self.chunk_size;

        for piece in pieces {
            let piece_len = char_len(piece);
            if len > 0 && len + piece_len > capacity {
                windows.push((start, end));
                start = end;
                len = 0;
                capacity = budget;
            }
            end += piece.len();
            len += piece_len;
        }
        if len > 0 {
            windows.push((start, end));
        }

        windows
            .iter()
            .enumerate()
            .map(|(i, &(start, end))| {
                let from = if i == 0 {
                    start
                } else {
                    retreat(text, start, self.chunk_overlap)
                };
                TextSpan {
                    char_offset: base_offset + text[..from].chars().count(),
                    text: text[from..end].to_string(),
                }
            })
            .collect()
    }

    /// Chunk every page of a document. `chunk_index` runs across pages.
    pub fn chunk_document(&self, document: &LoadedDocument) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for (page_index, page) in document.pages.iter().enumerate() {
            let page_number = document.format.is_paged().then_some(page_index + 1);

            for span in self.split_text(page) {
                chunks.push(Chunk {
                    text: span.text,
                    metadata: ChunkMetadata {
                        source: document.source.clone(),
                        page: page_number,
                        chunk_index: chunks.len(),
                        char_offset: span.char_offset,
                    },
                });
            }
        }

        debug!(
            "Split '{}' into {} chunks (size {}, overlap {})",
            document.source,
            chunks.len(),
            self.chunk_size,
            self.chunk_overlap
        );
        chunks
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn split_recursive<'a>(text: &'a str, max: usize, boundaries: &[Boundary], out: &mut Vec<&'a str>) {
    if char_len(text) <= max {
        out.push(text);
        return;
    }

    match boundaries.split_first() {
        Some((boundary, rest)) => {
            let segments = boundary.split(text);
            if segments.len() <= 1 {
                split_recursive(text, max, rest, out);
            } else {
                for segment in segments {
                    split_recursive(segment, max, rest, out);
                }
            }
        }
        None => hard_split(text, max, out),
    }
}

fn hard_split<'a>(text: &'a str, max: usize, out: &mut Vec<&'a str>) {
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == max {
            out.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
}

/// Sentences end at `.`, `!` or `?` followed by whitespace; the whitespace
/// stays with the sentence.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut after_terminal = false;

    for (idx, ch) in text.char_indices() {
        if after_terminal && ch.is_whitespace() {
            let end = idx + ch.len_utf8();
            pieces.push(&text[start..end]);
            start = end;
            after_terminal = false;
            continue;
        }
        after_terminal = matches!(ch, '.' | '!' | '?');
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Byte position `chars` characters before `byte_pos`.
fn retreat(text: &str, byte_pos: usize, chars: usize) -> usize {
    if chars == 0 {
        return byte_pos;
    }
    text[..byte_pos]
        .char_indices()
        .rev()
        .nth(chars - 1)
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}
