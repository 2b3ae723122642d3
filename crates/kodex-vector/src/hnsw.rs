//! Approximate store backed by an `edgevec` HNSW graph over squared L2.
//!
//! `edgevec` numbers vectors from 1 in insertion order, so a vector id maps
//! to position `id - 1`. Its level generator is seeded, which makes the same
//! inserts in the same order build the same graph.

use std::fmt;

use edgevec::hnsw::VectorId;
use edgevec::{HnswConfig, HnswIndex, VectorStorage};
use serde::{Deserialize, Serialize};

use crate::distance::{by_distance, l2_squared};
use crate::error::{Result, VectorError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswParams {
    /// Links per node on upper layers; layer 0 keeps twice as many.
    pub m: usize,
    /// Beam width while inserting.
    pub ef_construction: usize,
    /// Minimum beam width while searching.
    pub ef_search: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 32,
            ef_construction: 40,
            ef_search: 16,
        }
    }
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| VectorError::Hnsw(format!("{what} {value} out of range")))
}

impl HnswParams {
    fn graph_config(self, dimension: usize) -> Result<HnswConfig> {
        let m = to_u32(self.m, "m")?;
        Ok(HnswConfig {
            m,
            m0: m.saturating_mul(2),
            ef_construction: to_u32(self.ef_construction, "ef_construction")?,
            ef_search: to_u32(self.ef_search, "ef_search")?,
            dimensions: to_u32(dimension, "dimension")?,
            metric: HnswConfig::METRIC_L2_SQUARED,
            _reserved: [0; 2],
        })
    }
}

#[derive(Serialize, Deserialize)]
pub struct HnswStore {
    params: HnswParams,
    dimension: usize,
    graph: HnswIndex,
    storage: VectorStorage,
}

impl fmt::Debug for HnswStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HnswStore")
            .field("params", &self.params)
            .field("dimension", &self.dimension)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl HnswStore {
    /// # Errors
    ///
    /// Returns [`VectorError::Hnsw`] if `edgevec` rejects the parameters,
    /// e.g. `m < 2`.
    pub fn new(dimension: usize, params: HnswParams) -> Result<Self> {
        let config = params.graph_config(dimension)?;
        let storage = VectorStorage::new(&config, None);
        let graph =
            HnswIndex::new(config, &storage).map_err(|e| VectorError::Hnsw(e.to_string()))?;
        Ok(Self {
            params,
            dimension,
            graph,
            storage,
        })
    }

    #[must_use]
    pub fn params(&self) -> HnswParams {
        self.params
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one vector at position `len()`. The caller checks its
    /// dimension and that every value is finite.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::Hnsw`] if the graph rejects the vector.
    pub fn insert(&mut self, vector: &[f32]) -> Result<()> {
        self.graph
            .insert(vector, &mut self.storage)
            .map_err(|e| VectorError::Hnsw(e.to_string()))?;
        Ok(())
    }

    /// `k` nearest positions with squared distances, ascending.
    ///
    /// Falls back to an exact scan when the graph yields fewer than
    /// `min(k, len)` results or fails.
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let want = k.min(self.len());
        if want == 0 {
            return Vec::new();
        }

        match self.graph.search(query, want, &self.storage) {
            Ok(found) if found.len() >= want => {
                let mut hits: Vec<(usize, f32)> = found
                    .into_iter()
                    .filter_map(|r| Some((position(r.vector_id)?, r.distance)))
                    .collect();
                hits.sort_by(by_distance);
                hits.truncate(want);
                if hits.len() == want {
                    return hits;
                }
                tracing::debug!(want, got = hits.len(), "hnsw ids out of range, scanning");
            }
            Ok(found) => {
                tracing::debug!(want, got = found.len(), "hnsw search short, scanning");
            }
            Err(e) => tracing::warn!("hnsw search failed, scanning: {e}"),
        }
        self.exact_search(query, want)
    }

    fn exact_search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut scored: Vec<(usize, f32)> = (0..self.len())
            .map(|pos| {
                let id = VectorId(pos as u64 + 1);
                (pos, l2_squared(query, &self.storage.get_vector(id)))
            })
            .collect();
        scored.sort_by(by_distance);
        scored.truncate(k);
        scored
    }
}

fn position(id: VectorId) -> Option<usize> {
    id.0.checked_sub(1).and_then(|p| usize::try_from(p).ok())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;
    use crate::distance::exact_search;

    /// Deterministic points in `[-0.5, 0.5)` from a linear congruential walk.
    #[allow(clippy::cast_precision_loss)]
    fn points(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
        let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
        (0..n)
            .map(|_| {
                (0..dim)
                    .map(|_| {
                        state = state
                            .wrapping_mul(6_364_136_223_846_793_005)
                            .wrapping_add(1_442_695_040_888_963_407);
                        (state >> 40) as f32 / (1u64 << 24) as f32 - 0.5
                    })
                    .collect()
            })
            .collect()
    }

    fn build(data: &[Vec<f32>], params: HnswParams) -> HnswStore {
        let mut store = HnswStore::new(data[0].len(), params).unwrap();
        for v in data {
            store.insert(v).unwrap();
        }
        store
    }

    #[test]
    fn default_params() {
        let p = HnswParams::default();
        assert_eq!((p.m, p.ef_construction, p.ef_search), (32, 40, 16));
        let config = p.graph_config(8).unwrap();
        assert_eq!((config.m, config.m0, config.dimensions), (32, 64, 8));
        assert_eq!(config.metric, HnswConfig::METRIC_L2_SQUARED);
    }

    #[test]
    fn rejects_degenerate_m() {
        let params = HnswParams {
            m: 1,
            ..HnswParams::default()
        };
        assert!(matches!(
            HnswStore::new(4, params),
            Err(VectorError::Hnsw(_))
        ));
    }

    #[test]
    fn empty_store_returns_nothing() {
        let store = HnswStore::new(4, HnswParams::default()).unwrap();
        assert!(store.is_empty());
        assert!(store.search(&[0.0; 4], 5).is_empty());
    }

    #[test]
    fn single_vector() {
        let mut store = HnswStore::new(2, HnswParams::default()).unwrap();
        store.insert(&[1.0, 1.0]).unwrap();
        let hits = store.search(&[0.0, 0.0], 3);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 0);
        assert!((hits[0].1 - 2.0).abs() < 1e-6);
    }

    #[test]
    fn finds_exact_match_first() {
        let data = points(200, 8, 7);
        let store = build(&data, HnswParams::default());
        for target in [0, 57, 199] {
            let hits = store.search(&data[target], 5);
            assert_eq!(hits[0].0, target);
            assert!(hits[0].1.abs() < f32::EPSILON);
        }
    }

    #[test]
    fn recall_against_exact_search() {
        let data = points(400, 12, 42);
        let queries = points(20, 12, 4242);
        let store = build(&data, HnswParams::default());
        let flat: Vec<f32> = data.iter().flatten().copied().collect();

        let k = 10;
        let mut hit = 0;
        for q in &queries {
            let truth: HashSet<usize> = exact_search(&flat, 12, q, k)
                .into_iter()
                .map(|(id, _)| id)
                .collect();
            hit += store
                .search(q, k)
                .iter()
                .filter(|(id, _)| truth.contains(id))
                .count();
        }
        let recall = f64::from(u32::try_from(hit).unwrap()) / f64::from(20 * 10);
        assert!(recall >= 0.9, "recall = {recall}");
    }

    #[test]
    fn construction_is_deterministic() {
        let data = points(150, 6, 11);
        let a = build(&data, HnswParams::default());
        let b = build(&data, HnswParams::default());
        for q in points(5, 6, 99) {
            assert_eq!(a.search(&q, 8), b.search(&q, 8));
        }
    }

    #[test]
    fn bincode_round_trip_preserves_search() {
        let data = points(120, 6, 5);
        let store = build(&data, HnswParams::default());
        let bytes = bincode::serialize(&store).unwrap();
        let back: HnswStore = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back.len(), store.len());
        assert_eq!(back.params(), store.params());
        assert_eq!(back.search(&data[3], 7), store.search(&data[3], 7));
    }

    #[test]
    fn exact_scan_matches_flat_search() {
        let data = points(30, 4, 3);
        let store = build(&data, HnswParams::default());
        let flat: Vec<f32> = data.iter().flatten().copied().collect();
        let query = [0.1, -0.2, 0.3, 0.0];
        assert_eq!(store.exact_search(&query, 6), exact_search(&flat, 4, &query, 6));
    }

    proptest! {
        #[test]
        fn returns_min_k_n_sorted(n in 1usize..120, k in 1usize..40, seed in any::<u64>()) {
            let params = HnswParams { m: 4, ef_construction: 8, ef_search: 4 };
            let data = points(n, 3, seed);
            let store = build(&data, params);
            let hits = store.search(&points(1, 3, seed ^ 1)[0], k);
            prop_assert_eq!(hits.len(), k.min(n));
            prop_assert!(hits.windows(2).all(|w| w[0].1 <= w[1].1));
            let unique: HashSet<usize> = hits.iter().map(|h| h.0).collect();
            prop_assert_eq!(unique.len(), hits.len());
        }
    }
}
