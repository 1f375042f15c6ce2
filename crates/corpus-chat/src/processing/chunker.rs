//! Deterministic sliding-window chunker.
//!
//! Boundaries are computed over character counts and mapped back to byte
//! offsets, so multi-byte UTF-8 never splits. Exact boundaries matter:
//! retrieval determinism and index reproducibility depend on the same input
//! always producing the same chunks.

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkResult {
    pub index: usize,
    pub text: String,
    /// Byte offset of the chunk start in the source text.
    pub start_offset: usize,
    /// Byte offset one past the chunk end.
    pub end_offset: usize,
}

pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    /// `chunk_size` is in characters; `overlap_fraction` is the share of each
    /// chunk repeated at the start of the next one, clamped so the window
    /// always advances.
    pub fn new(chunk_size: usize, overlap_fraction: f32) -> Self {
        let chunk_size = chunk_size.max(1);
        let fraction = overlap_fraction.clamp(0.0, 1.0);
        let overlap = ((chunk_size as f32) * fraction).floor() as usize;
        let overlap = overlap.min(chunk_size - 1);
        Self {
            chunk_size,
            overlap,
        }
    }

    /// Overlap length in characters, as derived from the configured fraction.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into overlapping windows covering the whole input with no
    /// gaps. Empty input yields an empty sequence.
    pub fn chunk(&self, text: &str) -> Vec<ChunkResult> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char position, plus the end sentinel.
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = bounds.len() - 1;

        let step = self.chunk_size - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut index = 0;

        loop {
            let end = (start + self.chunk_size).min(char_count);
            let (byte_start, byte_end) = (bounds[start], bounds[end]);
            chunks.push(ChunkResult {
                index,
                text: text[byte_start..byte_end].to_string(),
                start_offset: byte_start,
                end_offset: byte_end,
            });
            if end == char_count {
                break;
            }
            start += step;
            index += 1;
        }

        chunks
    }
}
