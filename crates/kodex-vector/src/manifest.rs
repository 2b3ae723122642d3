use std::sync::{Mutex, PoisonError};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VectorError};

/// Summary of a saved index, published after every save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub index_version: String,
    pub num_chunks: usize,
    pub dimension: usize,
    /// UTC, ISO-8601 with a trailing `Z`.
    pub last_updated: String,
}

impl Manifest {
    #[must_use]
    pub fn new(version: u32, num_chunks: usize, dimension: usize) -> Self {
        Self {
            index_version: version.to_string(),
            num_chunks,
            dimension,
            last_updated: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

/// Destination for manifests, e.g. a key-value service.
pub trait ManifestSink: Send + Sync {
    /// # Errors
    ///
    /// Returns [`VectorError::Manifest`] if the manifest could not be
    /// delivered.
    fn report(&self, project_id: &str, manifest: &Manifest) -> Result<()>;
}

/// Discards every manifest.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopManifestSink;

impl ManifestSink for NoopManifestSink {
    fn report(&self, _project_id: &str, _manifest: &Manifest) -> Result<()> {
        Ok(())
    }
}

/// Keeps manifests in memory.
#[derive(Debug, Default)]
pub struct RecordingManifestSink {
    reports: Mutex<Vec<(String, Manifest)>>,
}

impl RecordingManifestSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Manifests received so far, oldest first.
    #[must_use]
    pub fn reports(&self) -> Vec<(String, Manifest)> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<(String, Manifest)> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl ManifestSink for RecordingManifestSink {
    fn report(&self, project_id: &str, manifest: &Manifest) -> Result<()> {
        self.reports
            .lock()
            .map_err(|e| VectorError::Manifest(e.to_string()))?
            .push((project_id.to_owned(), manifest.clone()));
        Ok(())
    }
}
