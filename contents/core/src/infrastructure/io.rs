// Copyright (c) 2026 The omnicm authors
// SPDX-License-Identifier: Apache-2.0

//! Guarded I/O primitives.
//!
//! Every backend call routes its errors through the taxonomy conversion
//! (`From<BackendError> for ContentsError`), which turns the backend's
//! permission category into an access-denied fault and passes everything
//! else through. Validation (`ensure_valid`) happens before any bytes move.

use std::io::Write as _;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tempfile::NamedTempFile;

use crate::domain::document::{Document, DocumentCodec};
use crate::domain::entry::{EntryKind, Format};
use crate::domain::error::ContentsError;
use crate::domain::paths::PathMapper;
use crate::domain::storage::{BackendError, DfsBackend, OpenMode};

/// Validated save/read primitives over a backend handle.
#[derive(Clone)]
pub struct SafeIo {
    backend: Arc<dyn DfsBackend>,
    mapper: PathMapper,
    codec: Arc<dyn DocumentCodec>,
}

impl SafeIo {
    pub fn new(
        backend: Arc<dyn DfsBackend>,
        mapper: PathMapper,
        codec: Arc<dyn DocumentCodec>,
    ) -> Self {
        Self {
            backend,
            mapper,
            codec,
        }
    }

    pub fn mapper(&self) -> &PathMapper {
        &self.mapper
    }

    pub fn backend(&self) -> &Arc<dyn DfsBackend> {
        &self.backend
    }

    pub fn codec(&self) -> &Arc<dyn DocumentCodec> {
        &self.codec
    }

    /// Reject hidden paths, kind mismatches, and (optionally) absence.
    ///
    /// Notebooks count as files for kind checking. No side effects.
    pub async fn ensure_valid(
        &self,
        api_path: &str,
        expected: Option<EntryKind>,
        must_exist: bool,
    ) -> Result<(), ContentsError> {
        if self.mapper.is_hidden(api_path) {
            return Err(ContentsError::HiddenPath(api_path.to_string()));
        }
        let native = self.mapper.to_native(api_path)?;
        if self.backend.exists(&native).await? {
            match expected {
                Some(EntryKind::File) | Some(EntryKind::Notebook) => {
                    if self.backend.is_dir(&native).await? {
                        return Err(ContentsError::WrongKind {
                            path: api_path.to_string(),
                            expected: "file",
                        });
                    }
                }
                Some(EntryKind::Directory) => {
                    if self.backend.is_file(&native).await? {
                        return Err(ContentsError::WrongKind {
                            path: api_path.to_string(),
                            expected: "directory",
                        });
                    }
                }
                None => {}
            }
        } else if must_exist {
            return Err(ContentsError::NotFound(api_path.to_string()));
        }
        Ok(())
    }

    /// Create a directory and apply `mode`.
    pub async fn create_directory(&self, api_path: &str, mode: u32) -> Result<(), ContentsError> {
        if self.mapper.is_hidden(api_path) {
            return Err(ContentsError::HiddenPath(api_path.to_string()));
        }
        let native = self.mapper.to_native(api_path)?;
        if self.backend.exists(&native).await? {
            return Err(ContentsError::AlreadyExists(api_path.to_string()));
        }
        self.backend.mkdir(&native).await?;
        self.backend.chmod(&native, mode).await?;
        Ok(())
    }

    /// Save raw content to a file, creating it if needed.
    ///
    /// Text content is written as UTF-8; base64 content is decoded first,
    /// and a decode failure leaves the target untouched.
    pub async fn write_raw_file(
        &self,
        api_path: &str,
        content: &str,
        format: Format,
    ) -> Result<(), ContentsError> {
        self.ensure_valid(api_path, Some(EntryKind::File), false)
            .await?;
        let bytes = match format {
            Format::Text => content.as_bytes().to_vec(),
            Format::Base64 => BASE64.decode(content).map_err(|e| ContentsError::Encoding {
                path: api_path.to_string(),
                reason: e.to_string(),
            })?,
            Format::Json => {
                return Err(ContentsError::Encoding {
                    path: api_path.to_string(),
                    reason: "file format must be 'text' or 'base64'".to_string(),
                })
            }
        };
        let native = self.mapper.to_native(api_path)?;
        let handle = self.backend.open(&native, OpenMode::Create).await?;
        let write_result = self.backend.write_at(&handle, 0, &bytes).await;
        self.backend.close(handle).await?;
        write_result.map_err(|e| ContentsError::Write {
            path: api_path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// Save a document: serialize to a uniquely named local staging file,
    /// upload the staged bytes, remove the staging file.
    ///
    /// The staging file is removed on success and failure alike (dropped
    /// with the `NamedTempFile`).
    pub async fn write_document(
        &self,
        api_path: &str,
        doc: &Document,
    ) -> Result<(), ContentsError> {
        self.ensure_valid(api_path, Some(EntryKind::File), false)
            .await?;
        let native = self.mapper.to_native(api_path)?;

        let bytes = self
            .codec
            .serialize(doc)
            .map_err(|e| ContentsError::Write {
                path: api_path.to_string(),
                reason: e.to_string(),
            })?;
        let mut staging = NamedTempFile::new().map_err(|e| ContentsError::Write {
            path: api_path.to_string(),
            reason: e.to_string(),
        })?;
        staging
            .write_all(&bytes)
            .and_then(|_| staging.flush())
            .map_err(|e| ContentsError::Write {
                path: api_path.to_string(),
                reason: e.to_string(),
            })?;

        self.backend
            .upload(&native, staging.path())
            .await
            .map_err(|e| match e {
                BackendError::PermissionDenied(msg) => ContentsError::PermissionDenied(msg),
                other => ContentsError::Write {
                    path: api_path.to_string(),
                    reason: other.to_string(),
                },
            })?;
        Ok(())
    }

    /// Read and parse a document.
    pub async fn read_document(&self, api_path: &str) -> Result<Document, ContentsError> {
        self.ensure_valid(api_path, Some(EntryKind::File), true)
            .await?;
        let native = self.mapper.to_native(api_path)?;
        let bytes = self.backend.read_all(&native).await?;
        self.codec.parse(&bytes).map_err(|e| ContentsError::Parse {
            path: api_path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Read a non-document file, returning `(content, format)`.
    ///
    /// Bytes that decode as UTF-8 always come back as text, even when
    /// base64 was requested. A decode failure fails when text was
    /// requested, and otherwise falls back to base64.
    pub async fn read_raw_file(
        &self,
        api_path: &str,
        requested: Option<Format>,
    ) -> Result<(String, Format), ContentsError> {
        self.ensure_valid(api_path, Some(EntryKind::File), true)
            .await?;
        let native = self.mapper.to_native(api_path)?;
        let bytes = self.backend.read_all(&native).await?;
        match String::from_utf8(bytes) {
            Ok(text) => Ok((text, Format::Text)),
            Err(err) => {
                if requested == Some(Format::Text) {
                    return Err(ContentsError::NotUtf8(api_path.to_string()));
                }
                Ok((BASE64.encode(err.as_bytes()), Format::Base64))
            }
        }
    }
}
