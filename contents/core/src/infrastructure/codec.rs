// Copyright (c) 2026 The omnicm authors
// SPDX-License-Identifier: Apache-2.0

//! Default document codec: JSON notebook format with HMAC-SHA256 trust
//! signing.
//!
//! The signature is computed over the document with its `signature` field
//! removed, so signing is idempotent and verification survives re-signing.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tracing::debug;

use crate::domain::document::{Document, DocumentCodec, DocumentError};

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_KEY: &str = "signature";
const TRUSTED_KEY: &str = "trusted";

/// JSON notebook codec with an HMAC-SHA256 notary.
pub struct NotebookCodec {
    secret: Vec<u8>,
}

impl NotebookCodec {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Hex digest over the document minus its signature field.
    fn digest(&self, doc: &Document) -> Result<String, DocumentError> {
        let mut unsigned = doc.clone();
        unsigned.metadata.remove(SIGNATURE_KEY);
        unsigned.metadata.remove(TRUSTED_KEY);
        let bytes = serde_json::to_vec(&unsigned)?;
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(&bytes);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl DocumentCodec for NotebookCodec {
    fn parse(&self, bytes: &[u8]) -> Result<Document, DocumentError> {
        let doc: Document = serde_json::from_slice(bytes)?;
        if doc.nbformat < 4 {
            return Err(DocumentError::Invalid(format!(
                "unsupported format version {}",
                doc.nbformat
            )));
        }
        Ok(doc)
    }

    fn serialize(&self, doc: &Document) -> Result<Vec<u8>, DocumentError> {
        Ok(serde_json::to_vec_pretty(doc)?)
    }

    fn sign(&self, doc: &mut Document, api_path: &str) {
        match self.digest(doc) {
            Ok(digest) => {
                doc.metadata.insert(
                    SIGNATURE_KEY.to_string(),
                    Value::String(format!("sha256:{digest}")),
                );
            }
            Err(err) => {
                // Signing is best-effort; an unsigned document is simply
                // untrusted on the next read.
                debug!(path = %api_path, error = %err, "failed to sign document");
            }
        }
    }

    fn mark_trusted(&self, doc: &mut Document, api_path: &str) {
        let stored = doc
            .metadata
            .get(SIGNATURE_KEY)
            .and_then(Value::as_str)
            .map(str::to_string);
        let trusted = match (stored, self.digest(doc)) {
            (Some(stored), Ok(digest)) => stored == format!("sha256:{digest}"),
            _ => false,
        };
        if !trusted {
            debug!(path = %api_path, "document signature missing or stale");
        }
        doc.metadata
            .insert(TRUSTED_KEY.to_string(), Value::Bool(trusted));
    }

    fn validate(&self, doc: &Document) -> Option<String> {
        if doc.nbformat != 4 {
            return Some(format!(
                "document format version {} is not the supported version 4",
                doc.nbformat
            ));
        }
        for (idx, cell) in doc.cells.iter().enumerate() {
            let has_type = cell
                .as_object()
                .is_some_and(|obj| obj.get("cell_type").is_some_and(Value::is_string));
            if !has_type {
                return Some(format!("cell {idx} is missing a cell_type"));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codec() -> NotebookCodec {
        NotebookCodec::new(b"test-secret".to_vec())
    }

    fn doc_with_cell() -> Document {
        let mut doc = Document::empty();
        doc.cells.push(json!({"cell_type": "code", "source": "1 + 1", "metadata": {}, "outputs": []}));
        doc
    }

    #[test]
    fn test_parse_serialize_round_trip() {
        let codec = codec();
        let doc = doc_with_cell();
        let bytes = codec.serialize(&doc).unwrap();
        let parsed = codec.parse(&bytes).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let codec = codec();
        assert!(codec.parse(b"not json at all").is_err());
        assert!(matches!(
            codec.parse(br#"{"nbformat": 3}"#),
            Err(DocumentError::Invalid(_))
        ));
    }

    #[test]
    fn test_sign_then_trusted() {
        let codec = codec();
        let mut doc = doc_with_cell();
        codec.sign(&mut doc, "nb.ipynb");
        assert!(doc.metadata.contains_key("signature"));

        codec.mark_trusted(&mut doc, "nb.ipynb");
        assert_eq!(doc.metadata["trusted"], Value::Bool(true));
    }

    #[test]
    fn test_tampered_document_untrusted() {
        let codec = codec();
        let mut doc = doc_with_cell();
        codec.sign(&mut doc, "nb.ipynb");
        doc.cells.push(json!({"cell_type": "code", "source": "evil()"}));
        codec.mark_trusted(&mut doc, "nb.ipynb");
        assert_eq!(doc.metadata["trusted"], Value::Bool(false));
    }

    #[test]
    fn test_unsigned_document_untrusted() {
        let codec = codec();
        let mut doc = doc_with_cell();
        codec.mark_trusted(&mut doc, "nb.ipynb");
        assert_eq!(doc.metadata["trusted"], Value::Bool(false));
    }

    #[test]
    fn test_sign_is_idempotent() {
        let codec = codec();
        let mut doc = doc_with_cell();
        codec.sign(&mut doc, "nb.ipynb");
        let first = doc.metadata["signature"].clone();
        codec.sign(&mut doc, "nb.ipynb");
        assert_eq!(doc.metadata["signature"], first);
    }

    #[test]
    fn test_validate_flags_bad_cells() {
        let codec = codec();
        assert!(codec.validate(&doc_with_cell()).is_none());

        let mut doc = doc_with_cell();
        doc.cells.push(json!({"source": "missing type"}));
        assert!(codec.validate(&doc).is_some());

        let mut doc = Document::empty();
        doc.nbformat = 5;
        assert!(codec.validate(&doc).is_some());
    }
}
