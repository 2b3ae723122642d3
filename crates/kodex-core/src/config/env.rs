use std::path::PathBuf;

use kodex_vector::IndexKind;

use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("KODEX_INDEX_DIR") {
            self.paths.index_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("KODEX_MODELS_DIR") {
            self.paths.models_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("KODEX_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("KODEX_EMBEDDING_BATCH_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.embedding.batch_size = n;
        }
        if let Ok(v) = std::env::var("KODEX_EMBEDDING_MAX_LENGTH")
            && let Ok(n) = v.parse::<usize>()
        {
            self.embedding.max_length = n;
        }
        if let Ok(v) = std::env::var("KODEX_INDEX_TYPE") {
            match v.parse::<IndexKind>() {
                Ok(kind) => self.index.index_type = kind,
                Err(_) => tracing::warn!("ignoring invalid KODEX_INDEX_TYPE value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("KODEX_TOP_K")
            && let Ok(k) = v.parse::<usize>()
        {
            self.index.top_k = k;
        }
        if let Ok(v) = std::env::var("KODEX_BACKEND_URL") {
            self.backend.url = if v.is_empty() { None } else { Some(v) };
        }
        if let Ok(v) = std::env::var("KODEX_SOURCE_ROOTS") {
            self.chunker.source_roots = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
    }
}
