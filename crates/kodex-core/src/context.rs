//! Chunk → embed → index pipeline over a set of per-project indexes.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use kodex_embed::{DefaultLoader, EmbeddingEncoder};
use kodex_index::{Chunk, ChunkFilters, ChunkReport, ProjectChunker};
use kodex_vector::{IndexStats, ManifestSink, NoopManifestSink, SearchHit, VectorIndex};

use crate::config::Config;
use crate::error::Result;
use crate::manifest_http::HttpManifestSink;

/// How [`PipelineContext::index_project`] treats an existing index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexMode {
    /// Start from an empty index.
    #[default]
    Rebuild,
    /// Append to the index on disk, creating it when absent.
    Append,
}

/// Outcome of one [`PipelineContext::index_project`] run.
#[derive(Debug)]
pub struct IndexReport {
    pub project_id: String,
    pub chunking: ChunkReport,
    pub vectors_added: usize,
    pub total_vectors: usize,
    pub version: u32,
    pub dimension: usize,
    pub duration_ms: u64,
}

pub struct PipelineContext {
    config: Config,
    encoder: EmbeddingEncoder,
    sink: Arc<dyn ManifestSink>,
    indexes: HashMap<String, VectorIndex>,
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("model", &self.encoder.model_name())
            .field("indexes", &self.indexes.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl PipelineContext {
    /// Build a context from configuration. Manifests go to the backend when
    /// `backend.url` is set and are dropped otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let sink: Arc<dyn ManifestSink> = match config.backend.url.as_deref() {
            Some(url) => Arc::new(HttpManifestSink::new(url, &config.backend)?),
            None => Arc::new(NoopManifestSink),
        };
        let loader = DefaultLoader::new(
            Some(config.paths.models_dir.clone()),
            config.embedding.max_length,
        );
        let encoder = EmbeddingEncoder::new(Box::new(loader))
            .with_max_length(config.embedding.max_length)
            .with_batch_size(config.embedding.batch_size);
        Ok(Self::with_parts(config, encoder, sink))
    }

    #[must_use]
    pub fn with_parts(
        config: Config,
        encoder: EmbeddingEncoder,
        sink: Arc<dyn ManifestSink>,
    ) -> Self {
        Self {
            config,
            encoder,
            sink,
            indexes: HashMap::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The encoder, loading the configured model on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded.
    pub fn encoder(&mut self) -> Result<&EmbeddingEncoder> {
        if !self.encoder.is_loaded() {
            self.encoder.load(&self.config.embedding.model)?;
        }
        Ok(&self.encoder)
    }

    /// Cached index of `project_id`, opened from disk or created on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded or the files on disk
    /// cannot be decoded.
    pub fn index(&mut self, project_id: &str) -> Result<&mut VectorIndex> {
        let dimension = if self.indexes.contains_key(project_id) {
            0
        } else {
            self.encoder()?.dimension()
        };

        match self.indexes.entry(project_id.to_owned()) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let mut index = new_index(&self.config, &self.sink, project_id, dimension);
                if index.load()? {
                    if index.dimension() != dimension {
                        tracing::warn!(
                            project = project_id,
                            stored = index.dimension(),
                            model = dimension,
                            "stored index dimension differs from the embedding model"
                        );
                    }
                } else {
                    index.create_index(None)?;
                }
                Ok(e.insert(index))
            }
        }
    }

    /// Chunk the sources under `root` using the configured source roots.
    #[must_use]
    pub fn chunk_project(
        &self,
        project_id: &str,
        root: &Path,
        filters: &ChunkFilters,
    ) -> (Vec<Chunk>, ChunkReport) {
        ProjectChunker::new(project_id, root)
            .with_source_roots(
                self.config
                    .chunker
                    .source_roots
                    .iter()
                    .map(PathBuf::from)
                    .collect(),
            )
            .chunk_project_with_report(filters)
    }

    /// Embed the source text of each chunk, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded or inference fails.
    pub fn embed_chunks(&mut self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.tokens.as_str()).collect();
        Ok(self.encoder()?.encode(&texts, None)?)
    }

    /// Chunk, embed and index a project, then save the index.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding, indexing or saving fails. Files that
    /// cannot be chunked are skipped and listed in the report.
    pub fn index_project(
        &mut self,
        project_id: &str,
        root: &Path,
        filters: &ChunkFilters,
        mode: IndexMode,
    ) -> Result<IndexReport> {
        let start = Instant::now();
        let (chunks, chunking) = self.chunk_project(project_id, root, filters);
        let vectors = self.embed_chunks(&chunks)?;

        if mode == IndexMode::Rebuild {
            let dimension = self.encoder()?.dimension();
            let mut index = new_index(&self.config, &self.sink, project_id, dimension);
            index.create_index(None)?;
            self.indexes.insert(project_id.to_owned(), index);
        }

        let vectors_added = vectors.len();
        let index = self.index(project_id)?;
        index.add_vectors(&vectors, chunks)?;
        index.save()?;

        let report = IndexReport {
            project_id: project_id.to_owned(),
            chunking,
            vectors_added,
            total_vectors: index.total_vector_count(),
            version: index.version(),
            dimension: index.dimension(),
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        tracing::info!(
            project = project_id,
            ?mode,
            added = report.vectors_added,
            total = report.total_vectors,
            duration_ms = report.duration_ms,
            "project indexed"
        );
        Ok(report)
    }

    /// Nearest chunks to `query`, closest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded, the index cannot be
    /// opened, or the index dimension differs from the model's.
    pub fn retrieve(
        &mut self,
        project_id: &str,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<SearchHit>> {
        let query = self.encoder()?.encode_single(query)?;
        Ok(self.index(project_id)?.search(&query, top_k)?)
    }

    /// Drop the cached index of `project_id`. Returns whether one was cached.
    pub fn evict(&mut self, project_id: &str) -> bool {
        self.indexes.remove(project_id).is_some()
    }

    /// Statistics of `project_id` without loading the embedding model.
    ///
    /// Reads the index from disk when it is not cached; an index that was
    /// never saved reports zero vectors and version 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the files on disk cannot be decoded.
    pub fn stats(&self, project_id: &str) -> Result<IndexStats> {
        if let Some(index) = self.indexes.get(project_id) {
            return Ok(index.stats());
        }
        let mut index = new_index(&self.config, &self.sink, project_id, 0);
        index.load()?;
        Ok(index.stats())
    }
}

fn new_index(
    config: &Config,
    sink: &Arc<dyn ManifestSink>,
    project_id: &str,
    dimension: usize,
) -> VectorIndex {
    VectorIndex::new(project_id, dimension, config.paths.index_dir.clone())
        .with_options(config.index.options())
        .with_sink(Arc::clone(sink))
}
