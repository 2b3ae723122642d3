//! Error types for kodex-index.

/// Errors that can occur while extracting chunks from source files.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// IO error reading source files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tree-sitter parsing error.
    #[error("parse failed: {0}")]
    Parse(String),

    /// Unsupported or unrecognized language.
    #[error("unsupported language")]
    UnsupportedLanguage,

    /// Source slice is not valid UTF-8.
    #[error("invalid UTF-8 in {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: std::str::Utf8Error,
    },

    /// Path is not located under the project root.
    #[error("{path} is outside project root {root}")]
    OutsideRoot { path: String, root: String },
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
