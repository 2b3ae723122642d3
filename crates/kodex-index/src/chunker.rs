//! Project-level chunking: walk source roots → detect language → extract chunks.

use std::path::{Path, PathBuf};

use crate::chunk::Chunk;
use crate::error::{IndexError, Result};
use crate::extractor::chunk_source;
use crate::languages::{detect_language, is_indexable};

/// Conventional Android source roots, relative to the project root.
pub const DEFAULT_SOURCE_ROOTS: &[&str] = &[
    "app/src/main/java",
    "app/src/main/kotlin",
    "app/src/main/res/layout",
];

/// Optional narrowing of a chunking pass.
#[derive(Debug, Clone, Default)]
pub struct ChunkFilters {
    /// Folders (relative to the project root) searched instead of the
    /// configured source roots.
    pub folders: Option<Vec<String>>,
    /// Keep only files whose path ends with one of these suffixes.
    pub paths: Option<Vec<String>>,
}

/// Summary of a chunking pass.
#[derive(Debug, Default)]
pub struct ChunkReport {
    pub files_scanned: usize,
    pub files_chunked: usize,
    pub files_skipped: usize,
    pub chunks_created: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

/// Walks a project's source roots and extracts chunks file by file.
#[derive(Debug, Clone)]
pub struct ProjectChunker {
    project_id: String,
    root: PathBuf,
    source_roots: Vec<PathBuf>,
}

impl ProjectChunker {
    #[must_use]
    pub fn new(project_id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            project_id: project_id.into(),
            root: root.into(),
            source_roots: DEFAULT_SOURCE_ROOTS.iter().map(PathBuf::from).collect(),
        }
    }

    /// Replace the default source roots (relative to the project root).
    #[must_use]
    pub fn with_source_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.source_roots = roots;
        self
    }

    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Chunk every discovered file. Files that fail are logged and skipped.
    #[must_use]
    pub fn chunk_project(&self, filters: &ChunkFilters) -> Vec<Chunk> {
        self.chunk_project_with_report(filters).0
    }

    /// Like [`Self::chunk_project`], also returning per-pass counters.
    #[must_use]
    pub fn chunk_project_with_report(&self, filters: &ChunkFilters) -> (Vec<Chunk>, ChunkReport) {
        tracing::info!(project = %self.project_id, "chunking started");
        let files = self.find_source_files(filters);
        tracing::info!(project = %self.project_id, total = files.len(), "source files found");
        self.chunk_files_with_report(&files)
    }

    /// Chunk `files` in order. A file that fails is logged, counted as
    /// skipped and recorded in [`ChunkReport::errors`]; the pass continues.
    #[must_use]
    pub fn chunk_files_with_report(&self, files: &[PathBuf]) -> (Vec<Chunk>, ChunkReport) {
        let start = std::time::Instant::now();
        let mut report = ChunkReport::default();
        let mut chunks = Vec::new();
        let total = files.len();

        for (i, path) in files.iter().enumerate() {
            report.files_scanned += 1;
            match self.chunk_file(path) {
                Ok(file_chunks) => {
                    tracing::debug!(
                        file = %path.display(),
                        progress = format_args!("{}/{total}", i + 1),
                        chunks = file_chunks.len(),
                    );
                    report.files_chunked += 1;
                    report.chunks_created += file_chunks.len();
                    chunks.extend(file_chunks);
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), "failed to chunk file: {e}");
                    report.files_skipped += 1;
                    report.errors.push(format!("{}: {e}", path.display()));
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        tracing::info!(
            project = %self.project_id,
            files = report.files_chunked,
            skipped = report.files_skipped,
            chunks = report.chunks_created,
            duration_ms = report.duration_ms,
            "chunking finished"
        );
        (chunks, report)
    }

    /// Discover indexable files under the search roots, sorted by name
    /// within each root. Missing roots are skipped.
    #[must_use]
    pub fn find_source_files(&self, filters: &ChunkFilters) -> Vec<PathBuf> {
        let search_roots: Vec<PathBuf> = match &filters.folders {
            Some(folders) => folders.iter().map(|f| self.root.join(f)).collect(),
            None => self.source_roots.iter().map(|r| self.root.join(r)).collect(),
        };

        let mut files = Vec::new();
        for search_root in &search_roots {
            if !search_root.is_dir() {
                tracing::debug!(root = %search_root.display(), "source root missing, skipped");
                continue;
            }
            files.extend(
                ignore::WalkBuilder::new(search_root)
                    .standard_filters(false)
                    .sort_by_file_name(std::ffi::OsStr::cmp)
                    .build()
                    .flatten()
                    .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()))
                    .map(ignore::DirEntry::into_path)
                    .filter(|p| is_indexable(p)),
            );
        }

        if let Some(suffixes) = &filters.paths {
            files.retain(|f| {
                let s = f.to_string_lossy();
                suffixes.iter().any(|suffix| s.ends_with(suffix.as_str()))
            });
        }

        files
    }

    /// Chunk a single file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is outside the project root, cannot be
    /// read, has no supported language, or cannot be parsed.
    pub fn chunk_file(&self, path: &Path) -> Result<Vec<Chunk>> {
        let rel_path = self.relative_path(path)?;
        let lang = detect_language(path).ok_or(IndexError::UnsupportedLanguage)?;
        let source = std::fs::read(path)?;
        chunk_source(&source, &self.project_id, &rel_path, lang)
    }

    /// `/`-separated path relative to the project root, independent of the
    /// host separator so chunk ids match across platforms.
    fn relative_path(&self, path: &Path) -> Result<String> {
        let rel = path
            .strip_prefix(&self.root)
            .map_err(|_| IndexError::OutsideRoot {
                path: path.display().to_string(),
                root: self.root.display().to_string(),
            })?;
        Ok(rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"))
    }
}
