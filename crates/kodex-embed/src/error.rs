#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("embedding model not loaded, call load() first")]
    NotLoaded,

    #[error("model loading failed: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("expected {expected}-dimensional embedding, backend returned {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "candle")]
    #[error("candle error: {0}")]
    Candle(#[from] candle_core::Error),
}

pub type Result<T> = std::result::Result<T, EmbedError>;
