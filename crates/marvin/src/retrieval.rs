//! Document chunking and similarity ranking for retrieval-augmented replies

use serde::Serialize;
use thiserror::Error;

use crate::store::schema::DocumentChunk;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

#[derive(Debug, Error, PartialEq)]
pub enum RetrievalError {
    #[error("vectors must have the same length ({left} vs {right})")]
    DimensionMismatch { left: usize, right: usize },
}

/// A chunk selected for a prompt, with the score that got it there.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RagSource {
    pub content: String,
    pub source: String,
    pub similarity: f32,
}

/// Split `text` into overlapping windows of at most `max_chunk_size` characters.
///
/// A window that does not reach the end of the text is shortened to end on the
/// last `.`, `!` or `?` inside it, provided that boundary lies past the middle
/// of the window. Chunks are trimmed and empty ones dropped.
pub fn chunk_text(text: &str, max_chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let max_chunk_size = max_chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < len {
        let mut end = start + max_chunk_size;

        if end < len {
            let sentence_end = chars[start..=end]
                .iter()
                .rposition(|c| matches!(c, '.' | '!' | '?'))
                .map(|offset| start + offset);

            if let Some(boundary) = sentence_end {
                if boundary as f64 > start as f64 + max_chunk_size as f64 * 0.5 {
                    end = boundary + 1;
                }
            }
        }

        let end = end.min(len);
        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if end == len {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

/// Cosine similarity; zero when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, RetrievalError> {
    if a.len() != b.len() {
        return Err(RetrievalError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Best `top_k` chunks by similarity to `query`, highest first.
///
/// Chunks without an embedding, or with a different dimension, are skipped.
pub fn rank_chunks<'a>(
    query: &[f32],
    chunks: &'a [DocumentChunk],
    top_k: usize,
    min_similarity: f32,
) -> Vec<(&'a DocumentChunk, f32)> {
    let mut scored: Vec<(&DocumentChunk, f32)> = chunks
        .iter()
        .filter_map(|chunk| {
            let embedding = chunk.embedding.as_deref()?;
            let score = cosine_similarity(query, embedding).ok()?;
            (score >= min_similarity).then_some((chunk, score))
        })
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_k);
    scored
}
