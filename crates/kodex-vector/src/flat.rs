use serde::{Deserialize, Serialize};

use crate::distance::exact_search;

/// Exact L2 store: vectors packed row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatStore {
    dimension: usize,
    rows: usize,
    data: Vec<f32>,
}

impl FlatStore {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            rows: 0,
            data: Vec::new(),
        }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Append one vector. The caller checks its dimension.
    pub fn insert(&mut self, vector: &[f32]) {
        self.data.extend_from_slice(vector);
        self.rows += 1;
    }

    /// `k` nearest positions with squared distances, ascending.
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        exact_search(&self.data, self.dimension, query, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_search() {
        let mut store = FlatStore::new(2);
        assert!(store.is_empty());
        store.insert(&[0.0, 1.0]);
        store.insert(&[3.0, 3.0]);
        assert_eq!(store.len(), 2);

        let hits = store.search(&[3.0, 2.0], 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, 1);
        assert!((hits[0].1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn counts_rows_even_without_width() {
        let mut store = FlatStore::new(0);
        store.insert(&[]);
        store.insert(&[]);
        assert_eq!(store.len(), 2);
        assert!(!store.is_empty());
    }
}
