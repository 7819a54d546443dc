// Copyright (c) 2026 The omnicm authors
// SPDX-License-Identifier: Apache-2.0

//! Local filesystem backend adapter.
//!
//! Treats the host filesystem as the "distributed" backend. Suitable for
//! single-node development and the test suite; production deployments use
//! the WebHDFS adapter.
//!
//! Native paths are used as-is — the gateway's root already points inside
//! this adapter's base directory.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::domain::storage::{
    BackendError, DfsBackend, FileHandle, FileInfo, FileKind, OpenMode,
};

/// Local filesystem implementation of [`DfsBackend`].
pub struct LocalDfsBackend {
    /// Base directory reported as the backend home.
    base: PathBuf,
    /// Open file table, keyed by opaque handle bytes.
    handles: Mutex<HashMap<Vec<u8>, File>>,
}

impl LocalDfsBackend {
    /// Create the adapter, creating the base directory if needed.
    pub fn new(base: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let base = base.into();
        std::fs::create_dir_all(&base)?;
        Ok(Self {
            base,
            handles: Mutex::new(HashMap::new()),
        })
    }

    fn with_handle<T>(
        &self,
        handle: &FileHandle,
        f: impl FnOnce(&mut File) -> std::io::Result<T>,
    ) -> Result<T, BackendError> {
        let mut table = self.handles.lock();
        let file = table.get_mut(&handle.0).ok_or(BackendError::InvalidHandle)?;
        f(file).map_err(BackendError::from)
    }
}

fn unix_seconds(time: std::io::Result<SystemTime>) -> i64 {
    time.ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[async_trait]
impl DfsBackend for LocalDfsBackend {
    async fn exists(&self, path: &str) -> Result<bool, BackendError> {
        Ok(Path::new(path).exists())
    }

    async fn is_dir(&self, path: &str) -> Result<bool, BackendError> {
        Ok(Path::new(path).is_dir())
    }

    async fn is_file(&self, path: &str) -> Result<bool, BackendError> {
        Ok(Path::new(path).is_file())
    }

    async fn info(&self, path: &str) -> Result<FileInfo, BackendError> {
        let metadata = std::fs::metadata(path)?;
        #[cfg(unix)]
        let permissions = {
            use std::os::unix::fs::PermissionsExt;
            Some(metadata.permissions().mode() & 0o7777)
        };
        #[cfg(not(unix))]
        let permissions = None;

        Ok(FileInfo {
            kind: if metadata.is_dir() {
                FileKind::Directory
            } else {
                FileKind::File
            },
            size: metadata.len(),
            last_modified: unix_seconds(metadata.modified()),
            last_accessed: unix_seconds(metadata.accessed()),
            permissions,
        })
    }

    async fn list(&self, path: &str) -> Result<Vec<String>, BackendError> {
        let mut children = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            children.push(entry.path().to_string_lossy().into_owned());
        }
        Ok(children)
    }

    async fn open(&self, path: &str, mode: OpenMode) -> Result<FileHandle, BackendError> {
        let file = match mode {
            OpenMode::Read => OpenOptions::new().read(true).open(path)?,
            OpenMode::Create => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?,
        };
        let handle = FileHandle(Uuid::new_v4().as_bytes().to_vec());
        self.handles.lock().insert(handle.0.clone(), file);
        Ok(handle)
    }

    async fn read_at(
        &self,
        handle: &FileHandle,
        offset: u64,
        length: usize,
    ) -> Result<Vec<u8>, BackendError> {
        self.with_handle(handle, |file| {
            file.seek(SeekFrom::Start(offset))?;
            let mut buf = vec![0u8; length];
            let n = file.read(&mut buf)?;
            buf.truncate(n);
            Ok(buf)
        })
    }

    async fn write_at(
        &self,
        handle: &FileHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<usize, BackendError> {
        self.with_handle(handle, |file| {
            file.seek(SeekFrom::Start(offset))?;
            file.write_all(data)?;
            Ok(data.len())
        })
    }

    async fn close(&self, handle: FileHandle) -> Result<(), BackendError> {
        let file = self
            .handles
            .lock()
            .remove(&handle.0)
            .ok_or(BackendError::InvalidHandle)?;
        file.sync_all()?;
        Ok(())
    }

    async fn upload(&self, path: &str, local: &Path) -> Result<(), BackendError> {
        std::fs::copy(local, path)?;
        Ok(())
    }

    async fn mkdir(&self, path: &str) -> Result<(), BackendError> {
        std::fs::create_dir_all(path)?;
        Ok(())
    }

    async fn chmod(&self, path: &str, mode: u32) -> Result<(), BackendError> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
        }
        #[cfg(not(unix))]
        let _ = (path, mode);
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), BackendError> {
        std::fs::rename(from, to)?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), BackendError> {
        if Path::new(path).is_dir() {
            std::fs::remove_dir_all(path)?;
        } else {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    async fn home(&self) -> Result<String, BackendError> {
        Ok(self.base.to_string_lossy().into_owned())
    }
}
