use crate::backend::{BackendLoader, DefaultLoader, EmbedBackend};
use crate::error::{EmbedError, Result};

pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
/// Token limit; texts are pre-truncated to four characters per token.
pub const DEFAULT_MAX_LENGTH: usize = 512;
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Friendly model names and the repositories they resolve to.
pub const MODELS: &[(&str, &str)] = &[
    ("mini", "sentence-transformers/all-MiniLM-L6-v2"),
    ("bge-small", "BAAI/bge-small-en-v1.5"),
    ("bge-base", "BAAI/bge-base-en-v1.5"),
    ("mpnet", "sentence-transformers/all-mpnet-base-v2"),
    ("instructor", "hkunlp/instructor-large"),
];

/// Resolve a friendly name; unknown names are used as-is.
#[must_use]
pub fn resolve_model_name(name: &str) -> &str {
    MODELS
        .iter()
        .find(|(alias, _)| *alias == name)
        .map_or(name, |(_, repo)| *repo)
}

struct Loaded {
    model_name: String,
    repo: String,
    backend: Box<dyn EmbedBackend>,
    dimension: usize,
}

/// Embedding model holder: load once, encode many.
pub struct EmbeddingEncoder {
    loader: Box<dyn BackendLoader>,
    loaded: Option<Loaded>,
    max_length: usize,
    batch_size: usize,
}

impl std::fmt::Debug for EmbeddingEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingEncoder")
            .field("model_name", &self.model_name())
            .field("dimension", &self.dimension())
            .field("max_length", &self.max_length)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl Default for EmbeddingEncoder {
    fn default() -> Self {
        Self::new(Box::new(DefaultLoader::new(None, DEFAULT_MAX_LENGTH)))
    }
}

impl EmbeddingEncoder {
    #[must_use]
    pub fn new(loader: Box<dyn BackendLoader>) -> Self {
        Self {
            loader,
            loaded: None,
            max_length: DEFAULT_MAX_LENGTH,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Token limit used for pre-truncation. Zero disables truncation.
    #[must_use]
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Default batch size for [`Self::encode`]. Zero falls back to
    /// [`DEFAULT_BATCH_SIZE`].
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = if batch_size == 0 {
            DEFAULT_BATCH_SIZE
        } else {
            batch_size
        };
        self
    }

    /// Load `model_name` (friendly alias or repository id).
    ///
    /// A no-op when the same repository is already loaded, under any of its
    /// names. Loading a different
    /// model replaces the current one.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError::ModelLoad`] if the backend cannot be created or
    /// fails the warm-up encode. The previous model, if any, stays loaded.
    pub fn load(&mut self, model_name: &str) -> Result<()> {
        let repo = resolve_model_name(model_name);
        if self.loaded.as_ref().is_some_and(|l| l.repo == repo) {
            tracing::debug!(model = model_name, repo, "embedding model already loaded");
            return Ok(());
        }

        tracing::info!(model = model_name, repo, "loading embedding model");
        let backend = self.loader.load(repo)?;
        let dimension = backend.dimension();
        if dimension == 0 {
            return Err(EmbedError::ModelLoad(format!(
                "{model_name} reports a zero embedding dimension"
            )));
        }

        let warm = backend
            .embed_batch(&["test"])
            .map_err(|e| EmbedError::ModelLoad(format!("warm-up encode failed: {e}")))?;
        if let Some(row) = warm.first()
            && row.len() != dimension
        {
            return Err(EmbedError::ModelLoad(format!(
                "{model_name} produced {} values, expected {dimension}",
                row.len()
            )));
        }

        self.loaded = Some(Loaded {
            model_name: model_name.to_owned(),
            repo: repo.to_owned(),
            backend,
            dimension,
        });
        tracing::info!(model = model_name, dimension, "embedding model loaded");
        Ok(())
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Native dimension of the loaded model, `0` before [`Self::load`].
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.loaded.as_ref().map_or(0, |l| l.dimension)
    }

    #[must_use]
    pub fn model_name(&self) -> Option<&str> {
        self.loaded.as_ref().map(|l| l.model_name.as_str())
    }

    /// Encode `texts` into L2-normalized rows, one per input, in order.
    ///
    /// Each text is cut to `max_length * 4` characters first. `batch_size`
    /// overrides the configured batch size.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError::NotLoaded`] before [`Self::load`], the
    /// backend's error if inference fails, or [`EmbedError::Inference`] for
    /// a row that cannot be scaled to unit length.
    pub fn encode<S: AsRef<str>>(
        &self,
        texts: &[S],
        batch_size: Option<usize>,
    ) -> Result<Vec<Vec<f32>>> {
        let loaded = self.loaded.as_ref().ok_or(EmbedError::NotLoaded)?;
        let batch_size = batch_size.filter(|b| *b > 0).unwrap_or(self.batch_size);
        let limit = match self.max_length {
            0 => usize::MAX,
            n => n.saturating_mul(4),
        };

        let mut rows = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size) {
            let inputs: Vec<&str> = batch
                .iter()
                .map(|t| truncate_chars(t.as_ref(), limit))
                .collect();
            let embedded = loaded.backend.embed_batch(&inputs)?;
            if embedded.len() != inputs.len() {
                return Err(EmbedError::Inference(format!(
                    "backend returned {} rows for {} inputs",
                    embedded.len(),
                    inputs.len()
                )));
            }
            for mut row in embedded {
                if row.len() != loaded.dimension {
                    return Err(EmbedError::Dimension {
                        expected: loaded.dimension,
                        actual: row.len(),
                    });
                }
                if !normalize(&mut row) {
                    return Err(EmbedError::Inference(format!(
                        "row {} has no finite non-zero norm",
                        rows.len()
                    )));
                }
                rows.push(row);
            }
        }

        tracing::debug!(count = rows.len(), dimension = loaded.dimension, "texts encoded");
        Ok(rows)
    }

    /// Encode one text.
    ///
    /// # Errors
    ///
    /// Same as [`Self::encode`].
    pub fn encode_single(&self, text: &str) -> Result<Vec<f32>> {
        self.encode(&[text], None)?
            .pop()
            .ok_or_else(|| EmbedError::Inference("backend returned no rows".into()))
    }
}

/// First `limit` characters of `text`, never splitting a code point.
fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Scale to unit L2 norm. `false`, with the row untouched, when the norm is
/// zero or not finite.
fn normalize(row: &mut [f32]) -> bool {
    let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return false;
    }
    for v in row.iter_mut() {
        *v /= norm;
    }
    true
}
