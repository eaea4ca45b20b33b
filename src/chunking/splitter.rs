use crate::config::ChunkingConfig;
use crate::ingestion::PageDocument;
use crate::types::RagError;

/// A bounded window of page text, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub source: String,
    pub page: usize,
    /// Zero-based position of this chunk within its page.
    pub chunk_index: usize,
    pub content: String,
}

/// Cut-position preferences, strongest first. Within a window the rightmost
/// qualifying boundary of the strongest tier wins; a hard cut at the size
/// limit is the last resort.
const BOUNDARY_TIERS: [&[&str]; 4] = [&["\n\n"], &["\n"], &[". ", "! ", "? "], &[" "]];

/// Splits text into windows of at most `chunk_size` characters with exactly
/// `chunk_overlap` characters shared between consecutive windows.
///
/// Lengths and overlap are counted in characters, never bytes, so multi-byte
/// text cannot split inside a code point. Output is deterministic for fixed
/// parameters: dropping the first `chunk_overlap` characters of every window
/// after the first and concatenating reconstructs the input exactly.
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveCharacterSplitter {
    pub fn new(config: &ChunkingConfig) -> Result<Self, RagError> {
        if config.chunk_size == 0 {
            return Err(RagError::Config("chunk size must be positive".into()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        Ok(Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        })
    }

    /// Splits one text. Whitespace-only text yields no chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        // bounds[i] = byte offset of the i-th character; bounds[n] = text.len().
        let mut bounds: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
        bounds.push(text.len());
        let total = bounds.len() - 1;
        if total <= self.chunk_size {
            return vec![text.to_string()];
        }

        let mut chunks = Vec::new();
        let mut start = 0usize;
        loop {
            let limit = (start + self.chunk_size).min(total);
            let end = if limit == total {
                total
            } else {
                self.cut_point(text, &bounds, start, limit)
            };
            chunks.push(text[bounds[start]..bounds[end]].to_string());
            if end == total {
                break;
            }
            start = end - self.chunk_overlap;
        }
        chunks
    }

    /// Splits every page, preserving source metadata and assigning per-page
    /// chunk indices.
    pub fn split_documents(&self, documents: &[PageDocument]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for document in documents {
            for (chunk_index, content) in
                self.split_text(&document.content).into_iter().enumerate()
            {
                chunks.push(Chunk {
                    source: document.source.clone(),
                    page: document.page,
                    chunk_index,
                    content,
                });
            }
        }
        chunks
    }

    /// Chooses the cut character index in `(start, limit]`, preferring the
    /// rightmost natural boundary that still lets the next window advance.
    fn cut_point(&self, text: &str, bounds: &[usize], start: usize, limit: usize) -> usize {
        // The next window starts `chunk_overlap` characters before the cut;
        // a cut at or below this floor would stall the walk.
        let floor = start + self.chunk_overlap + 1;
        let window = &text[bounds[start]..bounds[limit]];
        for tier in BOUNDARY_TIERS {
            let mut best: Option<usize> = None;
            for separator in tier {
                if let Some(pos) = window.rfind(separator) {
                    let cut_byte = bounds[start] + pos + separator.len();
                    // Separators are ASCII, so the byte after one is always a
                    // character boundary present in `bounds`.
                    if let Ok(cut) = bounds.binary_search(&cut_byte) {
                        if cut >= floor {
                            best = Some(best.map_or(cut, |current| current.max(cut)));
                        }
                    }
                }
            }
            if let Some(cut) = best {
                return cut;
            }
        }
        limit
    }
}
