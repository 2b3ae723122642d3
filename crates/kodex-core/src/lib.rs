//! Configuration, manifest publishing and the indexing pipeline.
//!
//! [`PipelineContext`] ties the chunker, the embedding encoder and the
//! per-project vector indexes together; [`Config`] is read from
//! `kodex.toml` with `KODEX_*` environment overrides.

pub mod config;
pub mod context;
pub mod error;
pub mod manifest_http;
mod retry;

pub use config::Config;
pub use context::{IndexMode, IndexReport, PipelineContext};
pub use error::{PipelineError, Result};
pub use manifest_http::{HttpManifestSink, manifest_key};
