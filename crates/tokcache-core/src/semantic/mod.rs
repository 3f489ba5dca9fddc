//! Approximate (semantic) retrieval
//!
//! [`EmbeddingGenerator`] turns cache keys into unit vectors and a
//! [`VectorIndex`] finds the stored keys closest to a query vector.

pub mod embedding;
pub mod vector_index;

pub use embedding::{normalize_text, EmbeddingGenerator, DEFAULT_DIMENSIONS};
pub use vector_index::{BruteForceIndex, SearchHit, VectorIndex};

/// Cosine similarity between two vectors
///
/// Returns 0.0 when lengths differ, either vector is empty, or either
/// magnitude is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
