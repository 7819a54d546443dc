// Copyright (c) 2026 The omnicm authors
// SPDX-License-Identifier: Apache-2.0

//! Structured notebook-style documents and the codec seam.
//!
//! The gateway never interprets cell contents; it treats the document as a
//! JSON structure with a format version and trust metadata. Parsing,
//! serialization, signing, and structural validation all go through the
//! [`DocumentCodec`] collaborator so the front end can swap formats.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

fn default_nbformat() -> u32 {
    4
}

/// A notebook-style document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default = "default_nbformat")]
    pub nbformat: u32,
    #[serde(default)]
    pub nbformat_minor: u32,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub cells: Vec<Value>,
    /// Format fields this layer does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    /// A minimal valid, empty document.
    pub fn empty() -> Self {
        Self {
            nbformat: 4,
            nbformat_minor: 5,
            metadata: Map::new(),
            cells: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

/// Document codec errors.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid document: {0}")]
    Invalid(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Serialization, trust-signing, and validation of documents.
pub trait DocumentCodec: Send + Sync {
    /// Parse raw bytes into a document.
    fn parse(&self, bytes: &[u8]) -> Result<Document, DocumentError>;

    /// Serialize a document to its canonical byte form.
    fn serialize(&self, doc: &Document) -> Result<Vec<u8>, DocumentError>;

    /// Attach a trust signature before the document is written out.
    fn sign(&self, doc: &mut Document, api_path: &str);

    /// Mark trust on a freshly read document (verifies the signature).
    fn mark_trusted(&self, doc: &mut Document, api_path: &str);

    /// Structural validation; returns a warning message when the document
    /// is usable but questionable, `None` when clean.
    fn validate(&self, doc: &Document) -> Option<String>;
}
