//! Vector similarity utilities.
//!
//! Pure-Rust cosine similarity and top-k ranking over stored passages.

use duneguide_core::store::Passage;
use sha2::{Digest, Sha256};

/// A passage together with its embedding, as held by a collection.
#[derive(Debug, Clone)]
pub struct StoredPassage {
    pub passage: Passage,
    pub embedding: Vec<f32>,
}

/// Stable passage ID derived from its content (SHA-256, hex).
pub fn content_id(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty, or if a component
/// is not finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if !denom.is_finite() || denom < 1e-10 {
        return 0.0;
    }

    let sim = dot / denom;
    if sim.is_finite() { sim as f32 } else { 0.0 }
}

/// Rank passages by cosine similarity to a query embedding.
///
/// Returns at most `limit` passages sorted by descending similarity, with
/// `score` set. Ties keep the collection's insertion order.
pub fn vector_search(
    entries: &[StoredPassage],
    query_embedding: &[f32],
    limit: usize,
) -> Vec<Passage> {
    let mut scored: Vec<(f32, &StoredPassage)> = entries
        .iter()
        .map(|entry| (cosine_similarity(&entry.embedding, query_embedding), entry))
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(limit);
    scored
        .into_iter()
        .map(|(score, entry)| Passage {
            score,
            ..entry.passage.clone()
        })
        .collect()
}
