//! Per-project vector index: an append-only store plus the chunk records
//! aligned with it by position.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use kodex_index::Chunk;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VectorError};
use crate::flat::FlatStore;
use crate::hnsw::{HnswParams, HnswStore};
use crate::manifest::{Manifest, ManifestSink, NoopManifestSink};

/// Results returned by [`VectorIndex::search`] when no `top_k` is given.
pub const DEFAULT_TOP_K: usize = 15;

/// Store layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Exact L2 scan.
    #[default]
    #[serde(alias = "IndexFlatL2")]
    Flat,
    /// Approximate HNSW graph.
    #[serde(alias = "HNSW")]
    Hnsw,
}

impl IndexKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Hnsw => "hnsw",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "flat" | "IndexFlatL2" => Ok(Self::Flat),
            "hnsw" | "HNSW" => Ok(Self::Hnsw),
            other => Err(format!("unsupported index type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    pub kind: IndexKind,
    pub hnsw: HnswParams,
    pub top_k: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            kind: IndexKind::Flat,
            hnsw: HnswParams::default(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
enum IndexStore {
    Flat(FlatStore),
    Hnsw(HnswStore),
}

impl IndexStore {
    fn new(kind: IndexKind, dimension: usize, params: HnswParams) -> Result<Self> {
        Ok(match kind {
            IndexKind::Flat => Self::Flat(FlatStore::new(dimension)),
            IndexKind::Hnsw => Self::Hnsw(HnswStore::new(dimension, params)?),
        })
    }

    fn kind(&self) -> IndexKind {
        match self {
            Self::Flat(_) => IndexKind::Flat,
            Self::Hnsw(_) => IndexKind::Hnsw,
        }
    }

    fn dimension(&self) -> usize {
        match self {
            Self::Flat(s) => s.dimension(),
            Self::Hnsw(s) => s.dimension(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Flat(s) => s.len(),
            Self::Hnsw(s) => s.len(),
        }
    }

    fn insert(&mut self, vector: &[f32]) -> Result<()> {
        match self {
            Self::Flat(s) => {
                s.insert(vector);
                Ok(())
            }
            Self::Hnsw(s) => s.insert(vector),
        }
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        match self {
            Self::Flat(s) => s.search(query, k),
            Self::Hnsw(s) => s.search(query, k),
        }
    }
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub chunk: Chunk,
    /// Squared L2 distance to the query.
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub project_id: String,
    pub dimension: usize,
    pub total_vectors: usize,
    pub version: u32,
    pub metadata_count: usize,
}

#[derive(Serialize)]
struct MetaFileRef<'a> {
    metadata: &'a [Chunk],
    version: u32,
    dimension: usize,
}

#[derive(Deserialize)]
struct MetaFile {
    metadata: Vec<Chunk>,
    version: u32,
    dimension: usize,
}

/// Vector index of one project.
pub struct VectorIndex {
    project_id: String,
    dimension: usize,
    dir: PathBuf,
    options: IndexOptions,
    store: Option<IndexStore>,
    metadata: Vec<Chunk>,
    version: u32,
    sink: Arc<dyn ManifestSink>,
}

impl fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorIndex")
            .field("project_id", &self.project_id)
            .field("dimension", &self.dimension)
            .field("dir", &self.dir)
            .field("kind", &self.kind())
            .field("total_vectors", &self.total_vector_count())
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// An uninitialized index; call [`Self::create_index`] or [`Self::load`].
    #[must_use]
    pub fn new(project_id: impl Into<String>, dimension: usize, dir: impl Into<PathBuf>) -> Self {
        Self {
            project_id: project_id.into(),
            dimension,
            dir: dir.into(),
            options: IndexOptions::default(),
            store: None,
            metadata: Vec::new(),
            version: 0,
            sink: Arc::new(NoopManifestSink),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: IndexOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ManifestSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Store layout, `None` while uninitialized.
    #[must_use]
    pub fn kind(&self) -> Option<IndexKind> {
        self.store.as_ref().map(IndexStore::kind)
    }

    #[must_use]
    pub fn is_created(&self) -> bool {
        self.store.is_some()
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[must_use]
    pub fn total_vector_count(&self) -> usize {
        self.store.as_ref().map_or(0, IndexStore::len)
    }

    /// Chunk records in vector order.
    #[must_use]
    pub fn metadata(&self) -> &[Chunk] {
        &self.metadata
    }

    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.dir.join(format!("{}.index", self.project_id))
    }

    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(format!("{}_meta.pkl", self.project_id))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Discard all state and start an empty store; `kind` defaults to the
    /// configured layout. Resets `version` to 1.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::ZeroDimension`] for a zero dimension, or
    /// [`VectorError::Hnsw`] if the graph parameters are rejected. The
    /// previous state is kept on error.
    pub fn create_index(&mut self, kind: Option<IndexKind>) -> Result<()> {
        if self.dimension == 0 {
            return Err(VectorError::ZeroDimension);
        }
        let kind = kind.unwrap_or(self.options.kind);
        self.store = Some(IndexStore::new(kind, self.dimension, self.options.hnsw)?);
        self.metadata.clear();
        self.version = 1;
        tracing::info!(
            project = %self.project_id,
            kind = %kind,
            dimension = self.dimension,
            "index created"
        );
        Ok(())
    }

    /// Append vectors and their chunk records.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::NotCreated`], [`VectorError::LengthMismatch`],
    /// [`VectorError::DimensionMismatch`] or [`VectorError::NonFinite`]; the
    /// index is untouched on those errors.
    pub fn add_vectors(&mut self, vectors: &[Vec<f32>], chunks: Vec<Chunk>) -> Result<()> {
        let dimension = self.dimension;
        let store = self.store.as_mut().ok_or(VectorError::NotCreated)?;
        if vectors.len() != chunks.len() {
            return Err(VectorError::LengthMismatch {
                vectors: vectors.len(),
                metadata: chunks.len(),
            });
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(VectorError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        if let Some(row) = vectors
            .iter()
            .position(|v| v.iter().any(|x| !x.is_finite()))
        {
            return Err(VectorError::NonFinite { row });
        }

        for (i, v) in vectors.iter().enumerate() {
            if let Err(e) = store.insert(v) {
                self.metadata.extend(chunks.into_iter().take(i));
                return Err(e);
            }
        }
        self.metadata.extend(chunks);

        tracing::info!(
            project = %self.project_id,
            added = vectors.len(),
            total_vectors = store.len(),
            dimension,
            "vectors added"
        );
        Ok(())
    }

    /// Nearest chunks to `query`, ascending by squared L2 distance.
    ///
    /// Returns `min(top_k, total)` hits; `None` or `Some(0)` uses the
    /// configured default. Empty for an empty or uninitialized index.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::DimensionMismatch`] if `query` has the wrong
    /// length, or [`VectorError::NonFinite`] if it holds a NaN or infinity.
    pub fn search(&self, query: &[f32], top_k: Option<usize>) -> Result<Vec<SearchHit>> {
        let Some(store) = self.store.as_ref().filter(|s| s.len() > 0) else {
            tracing::warn!(project = %self.project_id, "index is empty");
            return Ok(Vec::new());
        };
        if query.len() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(VectorError::NonFinite { row: 0 });
        }

        let top_k = top_k
            .filter(|k| *k > 0)
            .unwrap_or(self.options.top_k)
            .min(store.len());
        let hits: Vec<SearchHit> = store
            .search(query, top_k)
            .into_iter()
            .filter_map(|(pos, distance)| {
                self.metadata.get(pos).map(|chunk| SearchHit {
                    chunk: chunk.clone(),
                    distance,
                })
            })
            .collect();

        tracing::debug!(project = %self.project_id, top_k, results = hits.len(), "search");
        Ok(hits)
    }

    /// Write `<project_id>.index` and `<project_id>_meta.pkl`, then publish
    /// a manifest. A failing manifest sink is logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::NotCreated`] without an index, or an I/O or
    /// encoding error.
    pub fn save(&self) -> Result<()> {
        let store = self.store.as_ref().ok_or(VectorError::NotCreated)?;

        std::fs::create_dir_all(&self.dir)?;
        let index_path = self.index_path();
        std::fs::write(&index_path, bincode::serialize(store)?)?;

        let meta = MetaFileRef {
            metadata: &self.metadata,
            version: self.version,
            dimension: self.dimension,
        };
        std::fs::write(self.metadata_path(), serde_json::to_vec(&meta)?)?;

        tracing::info!(
            project = %self.project_id,
            path = %index_path.display(),
            vectors = store.len(),
            "index saved"
        );

        let manifest = Manifest::new(self.version, store.len(), self.dimension);
        if let Err(e) = self.sink.report(&self.project_id, &manifest) {
            tracing::warn!(project = %self.project_id, "failed to update manifest: {e}");
        }
        Ok(())
    }

    /// Restore a saved index. `Ok(false)` when no index file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the files cannot be read or decoded, or if the
    /// store and the records disagree.
    pub fn load(&mut self) -> Result<bool> {
        let index_path = self.index_path();
        if !index_path.exists() {
            tracing::warn!(project = %self.project_id, path = %index_path.display(), "index file not found");
            return Ok(false);
        }

        let store: IndexStore = bincode::deserialize(&std::fs::read(&index_path)?)?;
        let meta: MetaFile = serde_json::from_slice(&std::fs::read(self.metadata_path())?)?;

        if store.len() != meta.metadata.len() {
            return Err(VectorError::Corrupt(format!(
                "{} vectors but {} records",
                store.len(),
                meta.metadata.len()
            )));
        }
        if store.dimension() != meta.dimension {
            return Err(VectorError::Corrupt(format!(
                "store dimension {} but metadata dimension {}",
                store.dimension(),
                meta.dimension
            )));
        }

        self.options.kind = store.kind();
        self.store = Some(store);
        self.metadata = meta.metadata;
        self.version = meta.version;
        self.dimension = meta.dimension;

        tracing::info!(
            project = %self.project_id,
            vectors = self.total_vector_count(),
            version = self.version,
            "index loaded"
        );
        Ok(true)
    }

    /// Drop the in-memory index; files on disk are kept.
    pub fn clear(&mut self) {
        self.store = None;
        self.metadata.clear();
        self.version = 0;
    }

    #[must_use]
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            project_id: self.project_id.clone(),
            dimension: self.dimension,
            total_vectors: self.total_vector_count(),
            version: self.version,
            metadata_count: self.metadata.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use kodex_index::{ChunkMetadata, Lang, NodeKind, chunk_id};
    use proptest::prelude::*;

    use super::*;
    use crate::manifest::RecordingManifestSink;

    fn chunk(i: usize) -> Chunk {
        let path = format!("app/src/main/java/C{i}.java");
        Chunk {
            chunk_id: chunk_id("proj", &path, i),
            project_id: "proj".into(),
            path,
            node_type: NodeKind::ClassDeclaration,
            start_line: i,
            end_line: i + 2,
            tokens: format!("class C{i} {{}}"),
            metadata: ChunkMetadata {
                language: Lang::Java,
                node_type: NodeKind::ClassDeclaration,
                signature: None,
            },
            timestamp: Utc::now(),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn unit_rows(n: usize, dim: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| {
                let mut row = vec![0.0; dim];
                row[i % dim] = 1.0 + (i / dim) as f32;
                row
            })
            .collect()
    }

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n).map(chunk).collect()
    }

    fn created(dir: &Path, dim: usize) -> VectorIndex {
        let mut index = VectorIndex::new("proj", dim, dir);
        index.create_index(None).unwrap();
        index
    }

    #[test]
    fn new_index_is_uninitialized() {
        let index = VectorIndex::new("proj", 4, "/tmp/unused");
        assert!(!index.is_created());
        assert_eq!(index.version(), 0);
        assert_eq!(index.total_vector_count(), 0);
        assert_eq!(index.kind(), None);
    }

    #[test]
    fn create_index_resets_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = created(dir.path(), 4);
        index.add_vectors(&unit_rows(3, 4), chunks(3)).unwrap();
        index.create_index(Some(IndexKind::Hnsw)).unwrap();
        assert_eq!(index.version(), 1);
        assert_eq!(index.total_vector_count(), 0);
        assert!(index.metadata().is_empty());
        assert_eq!(index.kind(), Some(IndexKind::Hnsw));
    }

    #[test]
    fn zero_dimension_is_never_created() {
        let dir = tempfile::tempdir().unwrap();
        for kind in [IndexKind::Flat, IndexKind::Hnsw] {
            let mut index = VectorIndex::new("proj", 0, dir.path());
            let err = index.create_index(Some(kind)).unwrap_err();
            assert!(matches!(err, VectorError::ZeroDimension));
            assert!(!index.is_created());
            assert_eq!(index.version(), 0);

            let err = index.add_vectors(&[vec![], vec![]], chunks(2)).unwrap_err();
            assert!(matches!(err, VectorError::NotCreated));
            assert_eq!(index.stats().total_vectors, index.stats().metadata_count);
        }
    }

    #[test]
    fn rejected_hnsw_params_keep_previous_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = created(dir.path(), 4);
        index.add_vectors(&unit_rows(2, 4), chunks(2)).unwrap();
        index.options.hnsw.m = 1;
        let err = index.create_index(Some(IndexKind::Hnsw)).unwrap_err();
        assert!(matches!(err, VectorError::Hnsw(_)));
        assert_eq!(index.kind(), Some(IndexKind::Flat));
        assert_eq!(index.total_vector_count(), 2);
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for kind in [IndexKind::Flat, IndexKind::Hnsw] {
            let mut index = created(dir.path(), 4);
            index.create_index(Some(kind)).unwrap();
            let mut rows = unit_rows(3, 4);
            rows[2][1] = f32::NAN;
            let err = index.add_vectors(&rows, chunks(3)).unwrap_err();
            assert!(matches!(err, VectorError::NonFinite { row: 2 }));
            assert_eq!(index.total_vector_count(), 0);
            assert!(index.metadata().is_empty());

            index.add_vectors(&unit_rows(3, 4), chunks(3)).unwrap();
            let err = index.search(&[f32::INFINITY, 0.0, 0.0, 0.0], None).unwrap_err();
            assert!(matches!(err, VectorError::NonFinite { .. }));
        }
    }

    #[test]
    fn add_keeps_metadata_aligned() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = created(dir.path(), 4);
        index.add_vectors(&unit_rows(2, 4), chunks(2)).unwrap();
        assert_eq!(index.total_vector_count(), index.metadata().len());
        index.add_vectors(&unit_rows(3, 4), chunks(3)).unwrap();
        assert_eq!(index.total_vector_count(), 5);
        assert_eq!(index.metadata().len(), 5);
        assert_eq!(index.version(), 1);
    }

    #[test]
    fn add_without_index_fails() {
        let mut index = VectorIndex::new("proj", 4, "/tmp/unused");
        let err = index.add_vectors(&unit_rows(1, 4), chunks(1)).unwrap_err();
        assert!(matches!(err, VectorError::NotCreated));
        assert!(index.metadata().is_empty());
    }

    #[test]
    fn mismatched_add_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = created(dir.path(), 4);
        index.add_vectors(&unit_rows(2, 4), chunks(2)).unwrap();

        let err = index.add_vectors(&unit_rows(3, 4), chunks(2)).unwrap_err();
        assert!(matches!(
            err,
            VectorError::LengthMismatch {
                vectors: 3,
                metadata: 2
            }
        ));

        let mut rows = unit_rows(2, 4);
        rows[1].push(0.0);
        let err = index.add_vectors(&rows, chunks(2)).unwrap_err();
        assert!(matches!(
            err,
            VectorError::DimensionMismatch {
                expected: 4,
                actual: 5
            }
        ));

        assert_eq!(index.total_vector_count(), 2);
        assert_eq!(index.metadata().len(), 2);
    }

    #[test]
    fn flat_search_caps_at_total() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = created(dir.path(), 4);
        index.add_vectors(&unit_rows(5, 4), chunks(5)).unwrap();

        let hits = index.search(&[1.0, 0.0, 0.0, 0.0], Some(10)).unwrap();
        assert_eq!(hits.len(), 5);
        assert_eq!(hits[0].chunk.path, "app/src/main/java/C0.java");
        assert!(hits[0].distance.abs() < f32::EPSILON);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn search_defaults_to_configured_top_k() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = created(dir.path(), 4);
        index.add_vectors(&unit_rows(20, 4), chunks(20)).unwrap();
        assert_eq!(index.search(&[0.0; 4], None).unwrap().len(), DEFAULT_TOP_K);
        assert_eq!(index.search(&[0.0; 4], Some(0)).unwrap().len(), DEFAULT_TOP_K);
        assert_eq!(index.search(&[0.0; 4], Some(3)).unwrap().len(), 3);
    }

    #[test]
    fn search_empty_or_uninitialized_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let uninit = VectorIndex::new("proj", 4, dir.path());
        assert!(uninit.search(&[0.0; 4], Some(3)).unwrap().is_empty());
        let empty = created(dir.path(), 4);
        assert!(empty.search(&[0.0; 4], Some(3)).unwrap().is_empty());
    }

    #[test]
    fn search_rejects_wrong_query_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = created(dir.path(), 4);
        index.add_vectors(&unit_rows(1, 4), chunks(1)).unwrap();
        let err = index.search(&[0.0; 3], None).unwrap_err();
        assert!(matches!(err, VectorError::DimensionMismatch { .. }));
    }

    #[test]
    fn save_without_index_fails() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::new("proj", 4, dir.path());
        assert!(matches!(index.save(), Err(VectorError::NotCreated)));
        assert!(!index.index_path().exists());
    }

    #[test]
    fn load_missing_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = VectorIndex::new("proj", 4, dir.path());
        assert!(!index.load().unwrap());
        assert!(!index.is_created());
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("faiss");
        let mut index = created(&nested, 4);
        index.add_vectors(&unit_rows(6, 4), chunks(6)).unwrap();
        index.save().unwrap();

        assert!(nested.join("proj.index").exists());
        let meta: serde_json::Value =
            serde_json::from_slice(&std::fs::read(nested.join("proj_meta.pkl")).unwrap()).unwrap();
        assert_eq!(meta["version"], 1);
        assert_eq!(meta["dimension"], 4);
        assert_eq!(meta["metadata"].as_array().unwrap().len(), 6);
        assert_eq!(meta["metadata"][0]["chunkId"], index.metadata()[0].chunk_id);

        let mut reloaded = VectorIndex::new("proj", 4, &nested);
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.stats(), index.stats());
        assert_eq!(reloaded.metadata(), index.metadata());

        let query = [0.0, 2.0, 0.0, 0.0];
        assert_eq!(
            reloaded.search(&query, Some(4)).unwrap(),
            index.search(&query, Some(4)).unwrap()
        );
    }

    #[test]
    fn hnsw_round_trip_keeps_kind() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = VectorIndex::new("proj", 4, dir.path()).with_options(IndexOptions {
            kind: IndexKind::Hnsw,
            ..IndexOptions::default()
        });
        index.create_index(None).unwrap();
        index.add_vectors(&unit_rows(30, 4), chunks(30)).unwrap();
        index.save().unwrap();

        let mut reloaded = VectorIndex::new("proj", 4, dir.path());
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.kind(), Some(IndexKind::Hnsw));
        let query = [0.0, 0.0, 3.0, 0.0];
        assert_eq!(
            reloaded.search(&query, Some(5)).unwrap(),
            index.search(&query, Some(5)).unwrap()
        );
    }

    #[test]
    fn append_after_reload_keeps_version_and_positions() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = created(dir.path(), 4);
        index.add_vectors(&unit_rows(2, 4), chunks(2)).unwrap();
        index.save().unwrap();

        let mut reloaded = VectorIndex::new("proj", 4, dir.path());
        reloaded.load().unwrap();
        reloaded
            .add_vectors(&[vec![0.0, 0.0, 0.0, 9.0]], vec![chunk(7)])
            .unwrap();
        assert_eq!(reloaded.version(), 1);
        assert_eq!(reloaded.total_vector_count(), 3);

        let hits = reloaded.search(&[0.0, 0.0, 0.0, 9.0], Some(1)).unwrap();
        assert_eq!(hits[0].chunk.start_line, 7);
        assert_eq!(reloaded.metadata()[2].start_line, 7);
    }

    #[test]
    fn load_detects_misaligned_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = created(dir.path(), 4);
        index.add_vectors(&unit_rows(2, 4), chunks(2)).unwrap();
        index.save().unwrap();
        std::fs::write(
            index.metadata_path(),
            r#"{"metadata": [], "version": 1, "dimension": 4}"#,
        )
        .unwrap();

        let mut reloaded = VectorIndex::new("proj", 4, dir.path());
        assert!(matches!(reloaded.load(), Err(VectorError::Corrupt(_))));
    }

    #[test]
    fn clear_resets_to_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = created(dir.path(), 4);
        index.add_vectors(&unit_rows(2, 4), chunks(2)).unwrap();
        index.clear();
        assert_eq!(index.version(), 0);
        assert_eq!(index.total_vector_count(), 0);
        assert!(index.metadata().is_empty());
        assert!(index.search(&[0.0; 4], None).unwrap().is_empty());
    }

    #[test]
    fn save_reports_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingManifestSink::new());
        let mut index = VectorIndex::new("proj", 4, dir.path()).with_sink(sink.clone());
        index.create_index(None).unwrap();
        index.add_vectors(&unit_rows(3, 4), chunks(3)).unwrap();
        index.save().unwrap();

        let (project, manifest) = sink.last().unwrap();
        assert_eq!(project, "proj");
        assert_eq!(manifest.index_version, "1");
        assert_eq!(manifest.num_chunks, 3);
        assert_eq!(manifest.dimension, 4);
    }

    struct FailingSink;

    impl ManifestSink for FailingSink {
        fn report(&self, _: &str, _: &Manifest) -> Result<()> {
            Err(VectorError::Manifest("backend down".into()))
        }
    }

    #[test]
    fn failing_sink_does_not_fail_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = VectorIndex::new("proj", 4, dir.path()).with_sink(Arc::new(FailingSink));
        index.create_index(None).unwrap();
        assert!(index.save().is_ok());
        assert!(index.index_path().exists());
    }

    #[test]
    fn stats_report_counts() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = created(dir.path(), 4);
        index.add_vectors(&unit_rows(4, 4), chunks(4)).unwrap();
        let stats = index.stats();
        assert_eq!(
            stats,
            IndexStats {
                project_id: "proj".into(),
                dimension: 4,
                total_vectors: 4,
                version: 1,
                metadata_count: 4,
            }
        );
    }

    #[test]
    fn index_kind_accepts_legacy_names() {
        assert_eq!("IndexFlatL2".parse::<IndexKind>().unwrap(), IndexKind::Flat);
        assert_eq!("HNSW".parse::<IndexKind>().unwrap(), IndexKind::Hnsw);
        assert!("ivf".parse::<IndexKind>().is_err());
        let kind: IndexKind = serde_json::from_str("\"HNSW\"").unwrap();
        assert_eq!(kind, IndexKind::Hnsw);
        assert_eq!(serde_json::to_string(&IndexKind::Flat).unwrap(), "\"flat\"");
    }

    proptest! {
        #[test]
        fn search_returns_min_k_n_ascending(n in 0usize..40, k in 1usize..60, hnsw in any::<bool>()) {
            let dir = tempfile::tempdir().unwrap();
            let mut index = VectorIndex::new("proj", 3, dir.path());
            let kind = if hnsw { IndexKind::Hnsw } else { IndexKind::Flat };
            index.create_index(Some(kind)).unwrap();
            if n > 0 {
                index.add_vectors(&unit_rows(n, 3), chunks(n)).unwrap();
            }
            prop_assert_eq!(index.total_vector_count(), index.metadata().len());
            let hits = index.search(&[0.5, 0.0, 0.0], Some(k)).unwrap();
            prop_assert_eq!(hits.len(), k.min(n));
            prop_assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        }
    }
}
