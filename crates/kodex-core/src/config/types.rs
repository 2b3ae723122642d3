use std::path::PathBuf;

use kodex_embed::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_LENGTH, DEFAULT_MODEL};
use kodex_index::chunker::DEFAULT_SOURCE_ROOTS;
use kodex_vector::{DEFAULT_TOP_K, HnswParams, IndexKind, IndexOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub chunker: ChunkerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("./data/faiss")
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("./data/models")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Where `<project>.index` and `<project>_meta.pkl` live.
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,
    /// Download cache for embedding models.
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            index_dir: default_index_dir(),
            models_dir: default_models_dir(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.into()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Friendly alias (`mini`, `bge-small`, ...), hub repository id, or
    /// `hash` / `hash:<dim>` for the offline hashing backend.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            batch_size: default_batch_size(),
            max_length: default_max_length(),
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_hnsw_m() -> usize {
    HnswParams::default().m
}

fn default_ef_construction() -> usize {
    HnswParams::default().ef_construction
}

fn default_ef_search() -> usize {
    HnswParams::default().ef_search
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub index_type: IndexKind,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_hnsw_m")]
    pub hnsw_m: usize,
    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,
    #[serde(default = "default_ef_search")]
    pub ef_search: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_type: IndexKind::default(),
            top_k: default_top_k(),
            hnsw_m: default_hnsw_m(),
            ef_construction: default_ef_construction(),
            ef_search: default_ef_search(),
        }
    }
}

impl IndexConfig {
    #[must_use]
    pub fn options(&self) -> IndexOptions {
        IndexOptions {
            kind: self.index_type,
            hnsw: HnswParams {
                m: self.hnsw_m,
                ef_construction: self.ef_construction,
                ef_search: self.ef_search,
            },
            top_k: self.top_k,
        }
    }
}

fn default_source_roots() -> Vec<String> {
    DEFAULT_SOURCE_ROOTS.iter().map(|s| (*s).to_owned()).collect()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChunkerConfig {
    /// Folders searched below the project root.
    #[serde(default = "default_source_roots")]
    pub source_roots: Vec<String>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            source_roots: default_source_roots(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Base URL of the key-value API receiving index manifests. Manifests
    /// are not published when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
