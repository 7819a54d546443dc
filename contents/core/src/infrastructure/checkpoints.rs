// Copyright (c) 2026 The omnicm authors
// SPDX-License-Identifier: Apache-2.0

//! Single-slot checkpoint store.
//!
//! One named checkpoint per document, kept as a copy in a sibling
//! directory: `<parent>/<checkpoint_dir>/<stem>-checkpoint<ext>`. The store
//! is a cache, not a history: create overwrites the slot. All collaborators
//! arrive through the constructor; nothing is shared through globals.

use std::sync::Arc;

use chrono::DateTime;
use tracing::info;

use crate::config::{DEFAULT_CHECKPOINT_DIR, DEFAULT_CHUNK_SIZE};
use crate::domain::entry::{CheckpointRecord, CHECKPOINT_ID};
use crate::domain::error::ContentsError;
use crate::domain::paths::PathMapper;
use crate::domain::storage::{BackendError, DfsBackend, OpenMode};

/// Permission mode applied to checkpoint copies.
const CHECKPOINT_MODE: u32 = 0o770;

/// Maintains the one checkpoint slot per document path.
#[derive(Clone)]
pub struct CheckpointStore {
    backend: Arc<dyn DfsBackend>,
    mapper: PathMapper,
    checkpoint_dir: String,
    chunk_size: usize,
}

impl CheckpointStore {
    pub fn new(
        backend: Arc<dyn DfsBackend>,
        mapper: PathMapper,
        checkpoint_dir: impl Into<String>,
        chunk_size: usize,
    ) -> Self {
        Self {
            backend,
            mapper,
            checkpoint_dir: checkpoint_dir.into(),
            chunk_size,
        }
    }

    /// Store with the default sibling directory name and chunk size.
    pub fn with_defaults(backend: Arc<dyn DfsBackend>, mapper: PathMapper) -> Self {
        Self::new(backend, mapper, DEFAULT_CHECKPOINT_DIR, DEFAULT_CHUNK_SIZE)
    }

    /// API path of the checkpoint slot for a document.
    pub fn checkpoint_path(&self, document_path: &str) -> String {
        let (parent, name) = PathMapper::split(document_path);
        let (stem, ext) = match name.rfind('.') {
            Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
            _ => (name, ""),
        };
        let filename = format!("{stem}-{CHECKPOINT_ID}{ext}");
        let dir = PathMapper::join(parent, &self.checkpoint_dir);
        PathMapper::join(&dir, &filename)
    }

    /// Copy the current document bytes into the checkpoint slot.
    pub async fn create(&self, document_path: &str) -> Result<CheckpointRecord, ContentsError> {
        let src = self.mapper.to_native(document_path)?;
        if !self.backend.exists(&src).await? {
            return Err(ContentsError::NotFound(document_path.to_string()));
        }
        let cp_api = self.checkpoint_path(document_path);
        let (cp_dir, _) = PathMapper::split(&cp_api);
        let cp_dir_native = self.mapper.to_native(cp_dir)?;
        if !self.backend.exists(&cp_dir_native).await? {
            self.backend.mkdir(&cp_dir_native).await?;
        }
        let dst = self.mapper.to_native(&cp_api)?;
        self.copy_streamed(&src, &dst).await?;
        self.record(&cp_api).await
    }

    /// Copy the checkpoint bytes back over the live document.
    ///
    /// The id is only checked for existence; a single id is ever valid.
    pub async fn restore(
        &self,
        document_path: &str,
        checkpoint_id: &str,
    ) -> Result<(), ContentsError> {
        let cp_api = self.checkpoint_path(document_path);
        let src = self.mapper.to_native(&cp_api)?;
        if !self.backend.exists(&src).await? {
            return Err(ContentsError::NotFound(format!(
                "checkpoint {document_path}@{checkpoint_id}"
            )));
        }
        let dst = self.mapper.to_native(document_path)?;
        self.copy_streamed(&src, &dst).await
    }

    /// Move the checkpoint slot when its document is renamed.
    ///
    /// Silently a no-op when no checkpoint exists for the old path.
    pub async fn rename(
        &self,
        _checkpoint_id: &str,
        old_document_path: &str,
        new_document_path: &str,
    ) -> Result<(), ContentsError> {
        let old_cp = self.checkpoint_path(old_document_path);
        let new_cp = self.checkpoint_path(new_document_path);
        let old_native = self.mapper.to_native(&old_cp)?;
        if !self.backend.exists(&old_native).await? {
            return Ok(());
        }
        info!(from = %old_cp, to = %new_cp, "renaming checkpoint");
        let (new_dir, _) = PathMapper::split(&new_cp);
        let new_dir_native = self.mapper.to_native(new_dir)?;
        if !self.backend.exists(&new_dir_native).await? {
            self.backend.mkdir(&new_dir_native).await?;
        }
        let new_native = self.mapper.to_native(&new_cp)?;
        self.backend.rename(&old_native, &new_native).await?;
        Ok(())
    }

    /// Delete the checkpoint slot.
    pub async fn delete(
        &self,
        checkpoint_id: &str,
        document_path: &str,
    ) -> Result<(), ContentsError> {
        let cp_api = self.checkpoint_path(document_path);
        let native = self.mapper.to_native(&cp_api)?;
        if !self.backend.exists(&native).await? {
            return Err(ContentsError::NotFound(format!(
                "checkpoint {document_path}@{checkpoint_id}"
            )));
        }
        info!(checkpoint = %cp_api, "removing checkpoint");
        self.backend.delete(&native).await?;
        Ok(())
    }

    /// Zero or one records for the document's slot.
    pub async fn list(&self, document_path: &str) -> Result<Vec<CheckpointRecord>, ContentsError> {
        let cp_api = self.checkpoint_path(document_path);
        let native = self.mapper.to_native(&cp_api)?;
        if !self.backend.exists(&native).await? {
            return Ok(Vec::new());
        }
        Ok(vec![self.record(&cp_api).await?])
    }

    async fn record(&self, cp_api: &str) -> Result<CheckpointRecord, ContentsError> {
        let native = self.mapper.to_native(cp_api)?;
        let info = self.backend.info(&native).await?;
        Ok(CheckpointRecord {
            id: CHECKPOINT_ID.to_string(),
            last_modified: DateTime::from_timestamp(info.last_modified, 0)
                .unwrap_or(DateTime::UNIX_EPOCH),
        })
    }

    /// Streamed chunked copy between native paths.
    ///
    /// Both handles are closed on every exit path.
    async fn copy_streamed(&self, src: &str, dst: &str) -> Result<(), ContentsError> {
        let src_handle = self.backend.open(src, OpenMode::Read).await?;
        let dst_handle = match self.backend.open(dst, OpenMode::Create).await {
            Ok(handle) => handle,
            Err(err) => {
                let _ = self.backend.close(src_handle).await;
                return Err(err.into());
            }
        };

        let copy_result = async {
            let mut offset = 0u64;
            loop {
                let chunk = self
                    .backend
                    .read_at(&src_handle, offset, self.chunk_size)
                    .await?;
                if chunk.is_empty() {
                    break;
                }
                self.backend.write_at(&dst_handle, offset, &chunk).await?;
                offset += chunk.len() as u64;
            }
            Ok::<_, BackendError>(())
        }
        .await;

        let src_close = self.backend.close(src_handle).await;
        let dst_close = self.backend.close(dst_handle).await;
        copy_result?;
        src_close?;
        dst_close?;

        self.backend.chmod(dst, CHECKPOINT_MODE).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::local::LocalDfsBackend;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, CheckpointStore) {
        let tmp = TempDir::new().unwrap();
        let backend = Arc::new(LocalDfsBackend::new(tmp.path()).unwrap());
        let mapper = PathMapper::new(tmp.path().to_str().unwrap());
        (tmp, CheckpointStore::with_defaults(backend, mapper))
    }

    #[test]
    fn test_checkpoint_path_layout() {
        let (_tmp, store) = fixture();
        assert_eq!(
            store.checkpoint_path("nb.ipynb"),
            ".ipynb_checkpoints/nb-checkpoint.ipynb"
        );
        assert_eq!(
            store.checkpoint_path("a/b/report.ipynb"),
            "a/b/.ipynb_checkpoints/report-checkpoint.ipynb"
        );
        // No extension.
        assert_eq!(
            store.checkpoint_path("notes"),
            ".ipynb_checkpoints/notes-checkpoint"
        );
        // Leading dot is not an extension separator.
        assert_eq!(
            store.checkpoint_path("a/.profile"),
            "a/.ipynb_checkpoints/.profile-checkpoint"
        );
    }

    #[tokio::test]
    async fn test_create_list_delete_lifecycle() {
        let (tmp, store) = fixture();
        std::fs::write(tmp.path().join("nb.ipynb"), b"{\"cells\": []}").unwrap();

        assert!(store.list("nb.ipynb").await.unwrap().is_empty());

        let record = store.create("nb.ipynb").await.unwrap();
        assert_eq!(record.id, "checkpoint");
        assert!(tmp
            .path()
            .join(".ipynb_checkpoints/nb-checkpoint.ipynb")
            .exists());

        let records = store.list("nb.ipynb").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "checkpoint");

        store.delete("checkpoint", "nb.ipynb").await.unwrap();
        assert!(store.list("nb.ipynb").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_overwrites_slot() {
        let (tmp, store) = fixture();
        let doc = tmp.path().join("nb.ipynb");
        std::fs::write(&doc, b"v1").unwrap();
        store.create("nb.ipynb").await.unwrap();
        std::fs::write(&doc, b"v2").unwrap();
        store.create("nb.ipynb").await.unwrap();

        let slot = tmp.path().join(".ipynb_checkpoints/nb-checkpoint.ipynb");
        assert_eq!(std::fs::read(slot).unwrap(), b"v2");
        assert_eq!(store.list("nb.ipynb").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_restore() {
        let (tmp, store) = fixture();
        let doc = tmp.path().join("nb.ipynb");
        std::fs::write(&doc, b"original").unwrap();
        store.create("nb.ipynb").await.unwrap();
        std::fs::write(&doc, b"clobbered").unwrap();

        store.restore("nb.ipynb", "checkpoint").await.unwrap();
        assert_eq!(std::fs::read(&doc).unwrap(), b"original");
    }

    #[tokio::test]
    async fn test_create_missing_document() {
        let (_tmp, store) = fixture();
        let result = store.create("nb.ipynb").await;
        assert!(matches!(result, Err(ContentsError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_restore_missing_checkpoint() {
        let (tmp, store) = fixture();
        std::fs::write(tmp.path().join("nb.ipynb"), b"x").unwrap();
        let result = store.restore("nb.ipynb", "checkpoint").await;
        assert!(matches!(result, Err(ContentsError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_checkpoint() {
        let (_tmp, store) = fixture();
        let result = store.delete("checkpoint", "nb.ipynb").await;
        assert!(matches!(result, Err(ContentsError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rename_moves_slot() {
        let (tmp, store) = fixture();
        std::fs::write(tmp.path().join("old.ipynb"), b"x").unwrap();
        store.create("old.ipynb").await.unwrap();

        store.rename("checkpoint", "old.ipynb", "new.ipynb").await.unwrap();
        assert!(!tmp
            .path()
            .join(".ipynb_checkpoints/old-checkpoint.ipynb")
            .exists());
        assert!(tmp
            .path()
            .join(".ipynb_checkpoints/new-checkpoint.ipynb")
            .exists());
    }

    #[tokio::test]
    async fn test_rename_missing_is_noop() {
        let (_tmp, store) = fixture();
        store.rename("checkpoint", "old.ipynb", "new.ipynb").await.unwrap();
    }

    #[tokio::test]
    async fn test_streamed_copy_large_file() {
        let tmp = TempDir::new().unwrap();
        let backend = Arc::new(LocalDfsBackend::new(tmp.path()).unwrap());
        let mapper = PathMapper::new(tmp.path().to_str().unwrap());
        // Tiny chunk size forces multiple read/write rounds.
        let store = CheckpointStore::new(backend, mapper, ".ipynb_checkpoints", 7);

        let payload: Vec<u8> = (0..1000u32).flat_map(|i| i.to_le_bytes()).collect();
        std::fs::write(tmp.path().join("big.ipynb"), &payload).unwrap();
        store.create("big.ipynb").await.unwrap();

        let copied =
            std::fs::read(tmp.path().join(".ipynb_checkpoints/big-checkpoint.ipynb")).unwrap();
        assert_eq!(copied, payload);
    }
}
