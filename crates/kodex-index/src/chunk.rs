//! Chunk record and its location-derived identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{IndexError, Result};
use crate::extractor::signature;
use crate::languages::{Lang, NodeKind};
use crate::syntax::SyntaxNode;

/// Length of a chunk id in hex characters.
pub const CHUNK_ID_LEN: usize = 16;

/// One extracted syntactic unit of source code.
///
/// Serialized with camelCase keys; this is the record stored next to each
/// vector and handed to prompt builders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub chunk_id: String,
    pub project_id: String,
    /// Path relative to the project root.
    pub path: String,
    pub node_type: NodeKind,
    /// 0-based row of the node's first line.
    pub start_line: usize,
    /// 0-based row of the node's last line (inclusive).
    pub end_line: usize,
    /// Exact source text of the node.
    pub tokens: String,
    pub metadata: ChunkMetadata,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub language: Lang,
    pub node_type: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Deterministic chunk id: the first 16 hex chars of
/// `sha256("{project_id}:{path}:{start_line}")`.
///
/// Depends on location only, so an edit that keeps a declaration on the same
/// line keeps its id, while any edit shifting lines above it changes it.
#[must_use]
pub fn chunk_id(project_id: &str, path: &str, start_line: usize) -> String {
    let digest = Sha256::digest(format!("{project_id}:{path}:{start_line}").as_bytes());
    let mut id = format!("{digest:x}");
    id.truncate(CHUNK_ID_LEN);
    id
}

impl Chunk {
    /// Assemble a chunk from a matched node.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Decode`] if the node's text is not valid UTF-8.
    pub fn from_node<N: SyntaxNode>(
        node: &N,
        kind: NodeKind,
        source: &[u8],
        project_id: &str,
        rel_path: &str,
        lang: Lang,
    ) -> Result<Self> {
        let span = node.span();
        let tokens = node.text(source).map_err(|e| IndexError::Decode {
            path: rel_path.to_owned(),
            source: e,
        })?;

        let signature = if kind.is_function_like() {
            signature(node, source)
        } else {
            None
        };

        Ok(Self {
            chunk_id: chunk_id(project_id, rel_path, span.start_line),
            project_id: project_id.to_owned(),
            path: rel_path.to_owned(),
            node_type: kind,
            start_line: span.start_line,
            end_line: span.end_line,
            tokens: tokens.to_owned(),
            metadata: ChunkMetadata {
                language: lang,
                node_type: kind,
                signature,
            },
            timestamp: Utc::now(),
        })
    }
}
