#[derive(Debug, thiserror::Error)]
pub enum VectorError {
    #[error("index not created")]
    NotCreated,

    #[error("vector count {vectors} does not match metadata count {metadata}")]
    LengthMismatch { vectors: usize, metadata: usize },

    #[error("expected dimension {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("index dimension must be positive")]
    ZeroDimension,

    #[error("vector {row} holds a NaN or infinite value")]
    NonFinite { row: usize },

    #[error("hnsw graph error: {0}")]
    Hnsw(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index encoding failed: {0}")]
    Encode(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt index files: {0}")]
    Corrupt(String),

    #[error("manifest sync failed: {0}")]
    Manifest(String),
}

pub type Result<T> = std::result::Result<T, VectorError>;
