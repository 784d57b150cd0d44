use serde::{Deserialize, Serialize};

/// Configuration for text chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks
    pub chunk_overlap: usize,
    /// Maximum total chunks per source
    pub max_chunks: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            max_chunks: 256,
        }
    }
}

/// A text chunk with source information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    /// Character offset into the source text
    pub start_offset: usize,
    /// Chunk index within the source
    pub chunk_index: usize,
}

/// Splits documents into overlapping chunks, preferring sentence
/// boundaries near the end of each chunk.
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn split(&self, text: &str, source: &str) -> Vec<Chunk> {
        let chunk_size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let max_chunks = self.config.max_chunks;

        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();

        let mut chunks = Vec::new();
        if total_chars == 0 {
            return chunks;
        }

        let step = chunk_size.saturating_sub(overlap).max(1);
        let mut start = 0;
        let mut chunk_index = 0;

        while start < total_chars && chunks.len() < max_chunks {
            let end = (start + chunk_size).min(total_chars);
            let window: String = chars[start..end].iter().collect();

            let piece = if end < total_chars {
                cut_at_sentence_boundary(&window)
            } else {
                window
            };

            let trimmed = piece.trim();
            if !trimmed.is_empty() {
                chunks.push(Chunk {
                    text: trimmed.to_string(),
                    source: source.to_string(),
                    start_offset: start,
                    chunk_index,
                });
                chunk_index += 1;
            }

            start += step;
        }

        chunks
    }
}

/// Cuts the window back to the last sentence ending in its final fifth,
/// if there is one.
fn cut_at_sentence_boundary(text: &str) -> String {
    let sentence_endings = [". ", "! ", "? ", ".\n", "!\n", "?\n"];

    let mut search_start = (text.len() * 80) / 100;
    while search_start > 0 && !text.is_char_boundary(search_start) {
        search_start -= 1;
    }
    let tail = &text[search_start..];

    for ending in sentence_endings.iter() {
        if let Some(pos) = tail.rfind(ending) {
            let cut = search_start + pos + ending.len();
            return text[..cut].to_string();
        }
    }

    text.to_string()
}
