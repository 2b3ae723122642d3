//! Publishes index manifests to the backend key-value API.

use std::time::Duration;

use kodex_vector::{Manifest, ManifestSink, VectorError};

use crate::config::BackendConfig;
use crate::error::Result;
use crate::retry::{BASE_BACKOFF, send_with_retry};

/// Key under which the manifest of `project_id` is stored.
#[must_use]
pub fn manifest_key(project_id: &str) -> String {
    format!("project:{project_id}:faiss:manifest")
}

/// [`ManifestSink`] that `PUT`s `{"value": "<manifest json>"}` to
/// `<base_url>/api/kv/<key>`.
#[derive(Debug, Clone)]
pub struct HttpManifestSink {
    client: reqwest::blocking::Client,
    base_url: String,
    max_retries: u32,
    base_delay: Duration,
}

impl HttpManifestSink {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, config: &BackendConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            max_retries: config.max_retries,
            base_delay: BASE_BACKOFF,
        })
    }

    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    fn url(&self, key: &str) -> String {
        format!("{}/api/kv/{key}", self.base_url)
    }
}

impl ManifestSink for HttpManifestSink {
    fn report(&self, project_id: &str, manifest: &Manifest) -> kodex_vector::Result<()> {
        let key = manifest_key(project_id);
        let url = self.url(&key);
        let body = serde_json::json!({ "value": serde_json::to_string(manifest)? });

        let response = send_with_retry(&url, self.max_retries, self.base_delay, || {
            self.client.put(&url).json(&body).send()
        })
        .map_err(|e| VectorError::Manifest(format!("PUT {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VectorError::Manifest(format!("PUT {url} returned {status}")));
        }

        tracing::debug!(
            project_id,
            key = %key,
            num_chunks = manifest.num_chunks,
            "manifest published"
        );
        Ok(())
    }
}
