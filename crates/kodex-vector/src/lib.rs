//! Per-project vector index over chunk embeddings.
//!
//! A [`VectorIndex`] pairs an append-only vector store (exact [`FlatStore`]
//! or approximate [`HnswStore`]) with the chunk records at the same
//! positions, persists both under `<dir>/<project_id>.index` and
//! `<dir>/<project_id>_meta.pkl`, and publishes a [`Manifest`] after each
//! save.

pub mod distance;
pub mod error;
pub mod flat;
pub mod hnsw;
pub mod index;
pub mod manifest;

pub use error::{Result, VectorError};
pub use flat::FlatStore;
pub use hnsw::{HnswParams, HnswStore};
pub use index::{DEFAULT_TOP_K, IndexKind, IndexOptions, IndexStats, SearchHit, VectorIndex};
pub use manifest::{Manifest, ManifestSink, NoopManifestSink, RecordingManifestSink};
