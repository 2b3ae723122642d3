use kodex_embed::EmbedError;
use kodex_index::IndexError;
use kodex_vector::VectorError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("chunking failed: {0}")]
    Index(#[from] IndexError),

    #[error("embedding failed: {0}")]
    Embed(#[from] EmbedError),

    #[error("vector index error: {0}")]
    Vector(#[from] VectorError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
