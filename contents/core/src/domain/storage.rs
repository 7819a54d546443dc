// Copyright (c) 2026 The omnicm authors
// SPDX-License-Identifier: Apache-2.0

//! Backend filesystem abstraction.
//!
//! [`DfsBackend`] isolates the gateway from the concrete distributed
//! filesystem client. Adapters live in `infrastructure::storage`; a mock
//! suffices for unit tests. All methods take native (absolute, root-prefixed)
//! paths — API-path translation happens above this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque handle for an open backend file.
///
/// The internal encoding is adapter-specific.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct FileHandle(pub Vec<u8>);

/// File open mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read-only access.
    Read,
    /// Create or truncate, write access.
    Create,
}

/// Kind of a backend entry as reported by stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Directory,
}

/// Stat information for a backend path.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub kind: FileKind,
    /// Size in bytes (0 for directories on some backends).
    pub size: u64,
    /// Last modification time, seconds since the Unix epoch.
    pub last_modified: i64,
    /// Last access time, seconds since the Unix epoch.
    pub last_accessed: i64,
    /// POSIX permission bits, when the backend reports them.
    pub permissions: Option<u32>,
}

/// Backend filesystem errors.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("timeout while communicating with storage backend")]
    Timeout,

    #[error("invalid file handle")]
    InvalidHandle,

    #[error("IO error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unknown backend error: {0}")]
    Unknown(String),
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => BackendError::NotFound(err.to_string()),
            std::io::ErrorKind::PermissionDenied => BackendError::PermissionDenied(err.to_string()),
            std::io::ErrorKind::AlreadyExists => BackendError::AlreadyExists(err.to_string()),
            _ => BackendError::Io(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_connect() {
            BackendError::Network(err.to_string())
        } else {
            BackendError::Unknown(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Serialization(err.to_string())
    }
}

/// Chunk size used by the default whole-file read.
const READ_CHUNK: usize = 64 * 1024;

/// Distributed filesystem client abstraction.
///
/// All operations can fail with a [`BackendError`]; the permission category
/// is what the guarded I/O layer translates into an access-denied fault.
#[async_trait]
pub trait DfsBackend: Send + Sync {
    /// Does anything exist at `path`?
    async fn exists(&self, path: &str) -> Result<bool, BackendError>;

    /// Is `path` an existing directory?
    async fn is_dir(&self, path: &str) -> Result<bool, BackendError>;

    /// Is `path` an existing regular file?
    async fn is_file(&self, path: &str) -> Result<bool, BackendError>;

    /// Stat a path.
    async fn info(&self, path: &str) -> Result<FileInfo, BackendError>;

    /// List the immediate children of a directory, as native paths.
    ///
    /// Order is whatever the backend reports; nothing here sorts.
    async fn list(&self, path: &str) -> Result<Vec<String>, BackendError>;

    /// Open a file for reading or (re)creation.
    async fn open(&self, path: &str, mode: OpenMode) -> Result<FileHandle, BackendError>;

    /// Read up to `length` bytes at `offset`. A short (or empty) result
    /// signals EOF.
    async fn read_at(
        &self,
        handle: &FileHandle,
        offset: u64,
        length: usize,
    ) -> Result<Vec<u8>, BackendError>;

    /// Write `data` at `offset`, returning the number of bytes written.
    async fn write_at(
        &self,
        handle: &FileHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<usize, BackendError>;

    /// Close an open handle, flushing any buffered writes.
    async fn close(&self, handle: FileHandle) -> Result<(), BackendError>;

    /// Upload a local staging file to `path`, creating or replacing it.
    async fn upload(&self, path: &str, local: &std::path::Path) -> Result<(), BackendError>;

    /// Create a directory (and missing parents).
    async fn mkdir(&self, path: &str) -> Result<(), BackendError>;

    /// Apply POSIX permission bits to a path.
    async fn chmod(&self, path: &str, mode: u32) -> Result<(), BackendError>;

    /// Rename a file or directory.
    async fn rename(&self, from: &str, to: &str) -> Result<(), BackendError>;

    /// Delete a file, or a directory with its contents.
    async fn delete(&self, path: &str) -> Result<(), BackendError>;

    /// The backend's reported home directory, used as the default root.
    async fn home(&self) -> Result<String, BackendError>;

    /// Read a whole file into memory.
    ///
    /// The handle is closed on every exit path.
    async fn read_all(&self, path: &str) -> Result<Vec<u8>, BackendError> {
        let handle = self.open(path, OpenMode::Read).await?;
        let mut buf = Vec::new();
        let result = async {
            loop {
                let chunk = self.read_at(&handle, buf.len() as u64, READ_CHUNK).await?;
                if chunk.is_empty() {
                    break;
                }
                buf.extend_from_slice(&chunk);
            }
            Ok::<_, BackendError>(())
        }
        .await;
        self.close(handle).await?;
        result.map(|_| buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mapping() {
        let err: BackendError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, BackendError::PermissionDenied(_)));

        let err: BackendError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, BackendError::NotFound(_)));

        let err: BackendError =
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "dup").into();
        assert!(matches!(err, BackendError::AlreadyExists(_)));

        let err: BackendError = std::io::Error::other("boom").into();
        assert!(matches!(err, BackendError::Io(_)));
    }
}
