//! Similarity search over embedded keys

use super::cosine_similarity;
use crate::error::{CoreError, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A search result: stored id and its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub similarity: f32,
}

/// Add/search/delete over `(id, vector)` pairs
///
/// [`CacheEngine`](crate::CacheEngine) only talks to this trait, so an
/// approximate nearest-neighbour index can replace [`BruteForceIndex`].
pub trait VectorIndex: Send + Sync {
    /// Insert or replace the vector stored under `id`
    fn add(&self, id: &str, vector: Vec<f32>) -> Result<()>;

    /// Hits with `similarity >= threshold`, best first, at most `top_k`
    fn search(&self, query: &[f32], top_k: usize, threshold: f32) -> Result<Vec<SearchHit>>;

    /// Returns true if a vector was stored under `id`
    fn delete(&self, id: &str) -> bool;

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector length every stored and query vector must have
    fn dimensions(&self) -> usize;
}

/// Exhaustive O(n * d) search; fine for hundreds to low thousands of keys
#[derive(Debug)]
pub struct BruteForceIndex {
    dimensions: usize,
    vectors: DashMap<String, Vec<f32>>,
}

impl BruteForceIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: DashMap::new(),
        }
    }

    fn check_dimensions(&self, actual: usize) -> Result<()> {
        if actual != self.dimensions {
            return Err(CoreError::DimensionMismatch {
                expected: self.dimensions,
                actual,
            });
        }
        Ok(())
    }
}

impl VectorIndex for BruteForceIndex {
    fn add(&self, id: &str, vector: Vec<f32>) -> Result<()> {
        self.check_dimensions(vector.len())?;
        self.vectors.insert(id.to_string(), vector);
        Ok(())
    }

    fn search(&self, query: &[f32], top_k: usize, threshold: f32) -> Result<Vec<SearchHit>> {
        self.check_dimensions(query.len())?;

        let mut hits: Vec<SearchHit> = self
            .vectors
            .iter()
            .map(|entry| SearchHit {
                id: entry.key().clone(),
                similarity: cosine_similarity(query, entry.value()),
            })
            .filter(|hit| hit.similarity >= threshold)
            .collect();

        // Best first; equal scores by id so results are stable
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);

        Ok(hits)
    }

    fn delete(&self, id: &str) -> bool {
        self.vectors.remove(id).is_some()
    }

    fn clear(&self) {
        self.vectors.clear();
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(vectors: &[(&str, [f32; 3])]) -> BruteForceIndex {
        let index = BruteForceIndex::new(3);
        for (id, v) in vectors {
            index.add(id, v.to_vec()).unwrap();
        }
        index
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let index = index_with(&[
            ("x", [1.0, 0.0, 0.0]),
            ("xy", [1.0, 1.0, 0.0]),
            ("y", [0.0, 1.0, 0.0]),
        ]);

        let hits = index.search(&[1.0, 0.1, 0.0], 10, 0.0).unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["x", "xy", "y"]);
        assert!(hits[0].similarity > hits[1].similarity);
    }

    #[test]
    fn test_threshold_and_top_k() {
        let index = index_with(&[
            ("x", [1.0, 0.0, 0.0]),
            ("xy", [1.0, 1.0, 0.0]),
            ("z", [0.0, 0.0, 1.0]),
        ]);

        let hits = index.search(&[1.0, 0.0, 0.0], 10, 0.5).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.similarity >= 0.5));

        let hits = index.search(&[1.0, 0.0, 0.0], 1, 0.0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "x");
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let index = index_with(&[("x", [1.0, 0.0, 0.0])]);
        let hits = index.search(&[1.0, 0.0, 0.0], 1, 1.0).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_zero_query_scores_zero() {
        let index = index_with(&[("x", [1.0, 0.0, 0.0])]);
        let hits = index.search(&[0.0, 0.0, 0.0], 5, 0.0).unwrap();
        assert_eq!(hits[0].similarity, 0.0);
        assert!(index.search(&[0.0, 0.0, 0.0], 5, 0.01).unwrap().is_empty());
    }

    #[test]
    fn test_add_replaces_and_delete() {
        let index = index_with(&[("x", [1.0, 0.0, 0.0])]);
        index.add("x", vec![0.0, 1.0, 0.0]).unwrap();
        assert_eq!(index.len(), 1);

        let hits = index.search(&[0.0, 1.0, 0.0], 1, 0.99).unwrap();
        assert_eq!(hits[0].id, "x");

        assert!(index.delete("x"));
        assert!(!index.delete("x"));
        assert!(index.is_empty());
    }

    #[test]
    fn test_dimension_mismatch_leaves_state_intact() {
        let index = index_with(&[("x", [1.0, 0.0, 0.0])]);

        let err = index.search(&[1.0, 0.0], 1, 0.0).unwrap_err();
        assert!(matches!(
            err,
            CoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));

        assert!(index.add("y", vec![1.0; 4]).is_err());
        assert_eq!(index.len(), 1);
        assert_eq!(index.search(&[1.0, 0.0, 0.0], 5, 0.0).unwrap().len(), 1);
    }

    #[test]
    fn test_clear() {
        let index = index_with(&[("x", [1.0, 0.0, 0.0]), ("y", [0.0, 1.0, 0.0])]);
        index.clear();
        assert_eq!(index.len(), 0);
        assert!(index.search(&[1.0, 0.0, 0.0], 5, 0.0).unwrap().is_empty());
    }
}
