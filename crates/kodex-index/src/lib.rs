//! AST-based chunk extraction for JVM/Android source trees.
//!
//! Source files are parsed with tree-sitter, allow-listed declarations are
//! collected in pre-order, and each one becomes a [`Chunk`] whose identity is
//! derived from its location (project, path, start line).

pub mod chunk;
pub mod chunker;
pub mod error;
pub mod extractor;
pub mod languages;
pub mod syntax;

pub use chunk::{Chunk, ChunkMetadata, chunk_id};
pub use chunker::{ChunkFilters, ChunkReport, ProjectChunker};
pub use error::{IndexError, Result};
pub use languages::{Lang, NodeKind, detect_language, is_indexable};
