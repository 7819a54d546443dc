// Copyright (c) 2026 The omnicm authors
// SPDX-License-Identifier: Apache-2.0

//! Model types exchanged with the front end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::document::Document;

/// The single checkpoint slot id. Only one checkpoint per document is ever
/// supported.
pub const CHECKPOINT_ID: &str = "checkpoint";

/// Kind of an entry: notebook is a file-kind specialization by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Notebook,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
            EntryKind::Notebook => "notebook",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire format of entry content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Text,
    Base64,
    Json,
}

/// Content payload of a populated model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Notebook body.
    Json(Document),
    /// Directory listing of shallow child models.
    Listing(Vec<EntryModel>),
    /// Text or base64-encoded file body.
    Text(String),
}

/// Metadata-plus-optional-content view of one entry.
///
/// Invariants: `content` is populated iff content was requested and the read
/// succeeded; `format` is `Some` iff `content` is `Some`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryModel {
    /// Final path component; empty for the root.
    pub name: String,
    /// API path of the entry.
    pub path: String,
    pub last_modified: DateTime<Utc>,
    pub created: DateTime<Utc>,
    pub content: Option<Content>,
    pub format: Option<Format>,
    pub mimetype: Option<String>,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Owner-write permission bit; false when the backend cannot say.
    pub writable: bool,
    /// Validation warning attached to notebook models.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One checkpoint slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub id: String,
    pub last_modified: DateTime<Utc>,
}

/// Incoming save payload from the front end.
///
/// `kind` stays a raw string so that unknown types surface as the unhandled
/// content type fault rather than a deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub format: Option<Format>,
    pub content: Option<SaveContent>,
}

/// Content of a save request: a JSON document for notebooks, a string for
/// files.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SaveContent {
    Json(Document),
    Text(String),
}

impl SaveRequest {
    /// Convenience constructor for a text-file save.
    pub fn text_file(content: impl Into<String>) -> Self {
        Self {
            kind: Some("file".into()),
            format: Some(Format::Text),
            content: Some(SaveContent::Text(content.into())),
        }
    }

    /// Convenience constructor for a notebook save.
    pub fn notebook(doc: Document) -> Self {
        Self {
            kind: Some("notebook".into()),
            format: None,
            content: Some(SaveContent::Json(doc)),
        }
    }

    /// Convenience constructor for a directory save.
    pub fn directory() -> Self {
        Self {
            kind: Some("directory".into()),
            format: None,
            content: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serde_names() {
        assert_eq!(serde_json::to_string(&EntryKind::Notebook).unwrap(), "\"notebook\"");
        assert_eq!(serde_json::to_string(&Format::Base64).unwrap(), "\"base64\"");
        let kind: EntryKind = serde_json::from_str("\"directory\"").unwrap();
        assert_eq!(kind, EntryKind::Directory);
    }

    #[test]
    fn test_model_serializes_type_field() {
        let model = EntryModel {
            name: "b.txt".into(),
            path: "a/b.txt".into(),
            last_modified: DateTime::UNIX_EPOCH,
            created: DateTime::UNIX_EPOCH,
            content: Some(Content::Text("hello".into())),
            format: Some(Format::Text),
            mimetype: Some("text/plain".into()),
            kind: EntryKind::File,
            writable: true,
            message: None,
        };
        let value = serde_json::to_value(&model).unwrap();
        assert_eq!(value["type"], "file");
        assert_eq!(value["content"], "hello");
        assert_eq!(value["format"], "text");
        assert!(value.get("message").is_none());
    }

    #[test]
    fn test_save_request_untagged_content() {
        let req: SaveRequest = serde_json::from_str(
            r#"{"type": "file", "format": "text", "content": "hi"}"#,
        )
        .unwrap();
        assert_eq!(req.kind.as_deref(), Some("file"));
        assert!(matches!(req.content, Some(SaveContent::Text(_))));

        let req: SaveRequest = serde_json::from_str(
            r#"{"type": "notebook", "content": {"nbformat": 4, "nbformat_minor": 5, "metadata": {}, "cells": []}}"#,
        )
        .unwrap();
        assert!(matches!(req.content, Some(SaveContent::Json(_))));
    }
}
