//! Sentence embeddings for code chunks.
//!
//! [`EmbeddingEncoder`] owns one backend at a time, produced by a
//! [`BackendLoader`]. The default loader serves the deterministic hashing
//! backend for `hash` model names and, with the `candle` feature, BERT-family
//! sentence-transformers from the Hugging Face hub for everything else.

pub mod backend;
#[cfg(feature = "candle")]
pub mod candle;
pub mod encoder;
pub mod error;
pub mod hashing;

pub use backend::{BackendLoader, DefaultLoader, EmbedBackend};
pub use encoder::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_LENGTH, DEFAULT_MODEL, EmbeddingEncoder, MODELS,
    resolve_model_name,
};
pub use error::{EmbedError, Result};
pub use hashing::HashingBackend;
