use std::path::PathBuf;

use crate::error::{EmbedError, Result};
use crate::hashing::{DEFAULT_HASH_DIMENSION, HashingBackend};

/// A loaded embedding model.
pub trait EmbedBackend {
    /// Native output dimension.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts. Rows need not be normalized.
    ///
    /// # Errors
    ///
    /// Returns an error if tokenization or the forward pass fails.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
}

/// Produces a backend for a resolved model name.
pub trait BackendLoader {
    /// # Errors
    ///
    /// Returns [`EmbedError::ModelLoad`] if the model cannot be obtained.
    fn load(&self, model: &str) -> Result<Box<dyn EmbedBackend>>;
}

/// Loader used outside tests.
///
/// `hash` and `hash:<dim>` select [`HashingBackend`]; any other name is a
/// Hugging Face repo id served by the candle BERT backend.
#[derive(Debug, Clone, Default)]
pub struct DefaultLoader {
    /// Download cache for model files. `None` uses the hub default.
    pub models_dir: Option<PathBuf>,
    /// Token limit applied by the tokenizer.
    pub max_length: usize,
}

impl DefaultLoader {
    #[must_use]
    pub fn new(models_dir: Option<PathBuf>, max_length: usize) -> Self {
        Self {
            models_dir,
            max_length,
        }
    }
}

/// Parse `hash` / `hash:<dim>` model names.
///
/// # Errors
///
/// Returns an error for a malformed or zero dimension.
pub fn parse_hash_model(model: &str) -> Result<Option<usize>> {
    match model.strip_prefix("hash") {
        Some("") => Ok(Some(DEFAULT_HASH_DIMENSION)),
        Some(rest) => {
            let Some(dim) = rest.strip_prefix(':') else {
                return Ok(None);
            };
            match dim.parse::<usize>() {
                Ok(0) | Err(_) => Err(EmbedError::ModelLoad(format!(
                    "invalid hashing dimension in model name {model:?}"
                ))),
                Ok(dim) => Ok(Some(dim)),
            }
        }
        None => Ok(None),
    }
}

impl BackendLoader for DefaultLoader {
    fn load(&self, model: &str) -> Result<Box<dyn EmbedBackend>> {
        if let Some(dimension) = parse_hash_model(model)? {
            return Ok(Box::new(HashingBackend::new(dimension)));
        }
        self.load_hub_model(model)
    }
}

impl DefaultLoader {
    #[cfg(feature = "candle")]
    fn load_hub_model(&self, model: &str) -> Result<Box<dyn EmbedBackend>> {
        let device = crate::candle::detect_device();
        let backend = crate::candle::BertBackend::load(
            model,
            self.models_dir.as_deref(),
            self.max_length,
            &device,
        )?;
        Ok(Box::new(backend))
    }

    #[cfg(not(feature = "candle"))]
    #[allow(clippy::unused_self)]
    fn load_hub_model(&self, model: &str) -> Result<Box<dyn EmbedBackend>> {
        Err(EmbedError::ModelLoad(format!(
            "{model}: built without the `candle` feature, only `hash` models are available"
        )))
    }
}
