// Copyright (c) 2026 The omnicm authors
// SPDX-License-Identifier: Apache-2.0

//! Model construction: metadata-plus-optional-content views built from
//! backend stat calls and the guarded I/O primitives.

use std::sync::Arc;

use chrono::DateTime;
use futures::future::BoxFuture;
use tracing::warn;

use crate::domain::entry::{Content, EntryKind, EntryModel, Format};
use crate::domain::error::ContentsError;
use crate::domain::paths::PathMapper;
use crate::domain::policy::VisibilityPolicy;
use crate::domain::storage::{DfsBackend, FileKind};
use crate::infrastructure::io::SafeIo;

/// File extension that forces the notebook kind.
pub const DOCUMENT_EXT: &str = ".ipynb";

/// Builds [`EntryModel`] views for one gateway.
#[derive(Clone)]
pub struct ModelBuilder {
    backend: Arc<dyn DfsBackend>,
    io: SafeIo,
    policy: Arc<dyn VisibilityPolicy>,
}

impl ModelBuilder {
    pub fn new(io: SafeIo, policy: Arc<dyn VisibilityPolicy>) -> Self {
        Self {
            backend: io.backend().clone(),
            io,
            policy,
        }
    }

    fn mapper(&self) -> &PathMapper {
        self.io.mapper()
    }

    /// Resolve the kind for a get: an explicit hint wins, otherwise stat;
    /// the document extension overrides both.
    pub async fn resolve_kind(
        &self,
        api_path: &str,
        hint: Option<EntryKind>,
    ) -> Result<EntryKind, ContentsError> {
        let kind = match hint {
            Some(kind) => kind,
            None => {
                let native = self.mapper().to_native(api_path)?;
                if !self.backend.exists(&native).await? {
                    return Err(ContentsError::NotFound(api_path.to_string()));
                }
                match self.backend.info(&native).await?.kind {
                    FileKind::Directory => EntryKind::Directory,
                    FileKind::File => EntryKind::File,
                }
            }
        };
        if api_path.ends_with(DOCUMENT_EXT) {
            return Ok(EntryKind::Notebook);
        }
        Ok(kind)
    }

    /// Build the model for a path, dispatching on the resolved kind.
    ///
    /// Boxed because directory listings recurse into `build` for their
    /// children.
    pub fn build<'a>(
        &'a self,
        api_path: &'a str,
        with_content: bool,
        hint: Option<EntryKind>,
        format: Option<Format>,
    ) -> BoxFuture<'a, Result<EntryModel, ContentsError>> {
        Box::pin(async move {
            match self.resolve_kind(api_path, hint).await? {
                EntryKind::Directory => self.directory_model(api_path, with_content).await,
                EntryKind::Notebook => self.document_model(api_path, with_content).await,
                EntryKind::File => self.file_model(api_path, with_content, format).await,
            }
        })
    }

    /// Common base of every model: stat-derived metadata, no content.
    async fn base_model(
        &self,
        api_path: &str,
        kind: EntryKind,
    ) -> Result<EntryModel, ContentsError> {
        self.io.ensure_valid(api_path, Some(kind), true).await?;
        let native = self.mapper().to_native(api_path)?;
        let info = self.backend.info(&native).await?;

        let writable = match info.permissions {
            Some(bits) => bits & 0o200 != 0,
            None => {
                warn!(path = %api_path, "failed to check write permissions");
                false
            }
        };

        Ok(EntryModel {
            name: PathMapper::basename(api_path).to_string(),
            path: PathMapper::normalize(api_path),
            last_modified: DateTime::from_timestamp(info.last_modified, 0)
                .unwrap_or(DateTime::UNIX_EPOCH),
            created: DateTime::from_timestamp(info.last_accessed, 0)
                .unwrap_or(DateTime::UNIX_EPOCH),
            content: None,
            format: None,
            mimetype: None,
            kind,
            writable,
            message: None,
        })
    }

    /// Directory model; with content, a shallow listing of visible children
    /// in backend order.
    pub async fn directory_model(
        &self,
        api_path: &str,
        with_content: bool,
    ) -> Result<EntryModel, ContentsError> {
        let mut model = self.base_model(api_path, EntryKind::Directory).await?;
        if with_content {
            let native = self.mapper().to_native(api_path)?;
            let mut children = Vec::new();
            for child_native in self.backend.list(&native).await? {
                let name = PathMapper::basename(&child_native).to_string();
                let child_api = PathMapper::join(api_path, &name);
                if !self.policy.should_list(&name) || self.mapper().is_hidden(&child_api) {
                    continue;
                }
                let child = self.build(&child_api, false, None, None).await?;
                children.push(child);
            }
            model.content = Some(Content::Listing(children));
            model.format = Some(Format::Json);
        }
        Ok(model)
    }

    /// File model; with content, the raw file body and its actual format.
    pub async fn file_model(
        &self,
        api_path: &str,
        with_content: bool,
        format: Option<Format>,
    ) -> Result<EntryModel, ContentsError> {
        let mut model = self.base_model(api_path, EntryKind::File).await?;
        model.mimetype = mime_guess::from_path(api_path)
            .first_raw()
            .map(str::to_string);
        if with_content {
            let (content, actual) = self.io.read_raw_file(api_path, format).await?;
            if model.mimetype.is_none() {
                model.mimetype = Some(
                    match actual {
                        Format::Base64 => "application/octet-stream",
                        _ => "text/plain",
                    }
                    .to_string(),
                );
            }
            model.content = Some(Content::Text(content));
            model.format = Some(actual);
        }
        Ok(model)
    }

    /// Notebook model; with content, the parsed document after trust
    /// marking and structural validation.
    pub async fn document_model(
        &self,
        api_path: &str,
        with_content: bool,
    ) -> Result<EntryModel, ContentsError> {
        let mut model = self.base_model(api_path, EntryKind::Notebook).await?;
        if with_content {
            let mut doc = self.io.read_document(api_path).await?;
            self.io.codec().mark_trusted(&mut doc, api_path);
            model.message = self.io.codec().validate(&doc);
            model.content = Some(Content::Json(doc));
            model.format = Some(Format::Json);
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::Document;
    use crate::domain::policy::{ListAll, VisibilityPolicy};
    use crate::infrastructure::codec::NotebookCodec;
    use crate::infrastructure::storage::local::LocalDfsBackend;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, ModelBuilder) {
        fixture_with_policy(Arc::new(ListAll))
    }

    fn fixture_with_policy(policy: Arc<dyn VisibilityPolicy>) -> (TempDir, ModelBuilder) {
        let tmp = TempDir::new().unwrap();
        let backend = Arc::new(LocalDfsBackend::new(tmp.path()).unwrap());
        let mapper = PathMapper::new(tmp.path().to_str().unwrap());
        let io = SafeIo::new(backend, mapper, Arc::new(NotebookCodec::new(b"s".to_vec())));
        (tmp, ModelBuilder::new(io, policy))
    }

    #[tokio::test]
    async fn test_resolve_kind_stat_and_override() {
        let (tmp, builder) = fixture();
        std::fs::write(tmp.path().join("f.txt"), "x").unwrap();
        std::fs::create_dir(tmp.path().join("d")).unwrap();
        std::fs::write(tmp.path().join("nb.ipynb"), "{}").unwrap();

        assert_eq!(builder.resolve_kind("f.txt", None).await.unwrap(), EntryKind::File);
        assert_eq!(builder.resolve_kind("d", None).await.unwrap(), EntryKind::Directory);
        // Extension forces notebook regardless of stat or hint.
        assert_eq!(builder.resolve_kind("nb.ipynb", None).await.unwrap(), EntryKind::Notebook);
        assert_eq!(
            builder.resolve_kind("nb.ipynb", Some(EntryKind::File)).await.unwrap(),
            EntryKind::Notebook
        );
    }

    #[tokio::test]
    async fn test_resolve_kind_missing_without_hint() {
        let (_tmp, builder) = fixture();
        let result = builder.resolve_kind("missing.txt", None).await;
        assert!(matches!(result, Err(ContentsError::NotFound(_))));
        // A hint skips the stat entirely.
        assert_eq!(
            builder.resolve_kind("missing.txt", Some(EntryKind::File)).await.unwrap(),
            EntryKind::File
        );
    }

    #[tokio::test]
    async fn test_file_model_mimetype_fallbacks() {
        let (tmp, builder) = fixture();
        std::fs::write(tmp.path().join("noext"), "plain text").unwrap();
        let model = builder.file_model("noext", true, None).await.unwrap();
        assert_eq!(model.mimetype.as_deref(), Some("text/plain"));

        std::fs::write(tmp.path().join("blob"), [0xffu8, 0xfe]).unwrap();
        let model = builder.file_model("blob", true, None).await.unwrap();
        assert_eq!(model.mimetype.as_deref(), Some("application/octet-stream"));
        assert_eq!(model.format, Some(Format::Base64));
    }

    #[tokio::test]
    async fn test_file_model_known_mimetype() {
        let (tmp, builder) = fixture();
        std::fs::write(tmp.path().join("a.txt"), "hi").unwrap();
        let model = builder.file_model("a.txt", true, None).await.unwrap();
        assert_eq!(model.mimetype.as_deref(), Some("text/plain"));
        assert!(matches!(model.content, Some(Content::Text(ref s)) if s == "hi"));
    }

    #[tokio::test]
    async fn test_shallow_model_has_no_content() {
        let (tmp, builder) = fixture();
        std::fs::write(tmp.path().join("a.txt"), "hi").unwrap();
        let model = builder.file_model("a.txt", false, None).await.unwrap();
        assert!(model.content.is_none());
        assert!(model.format.is_none());
    }

    #[tokio::test]
    async fn test_directory_listing_filters_hidden() {
        let (tmp, builder) = fixture();
        std::fs::write(tmp.path().join("visible.txt"), "x").unwrap();
        std::fs::write(tmp.path().join(".hidden"), "x").unwrap();
        std::fs::create_dir(tmp.path().join(".ipynb_checkpoints")).unwrap();

        let model = builder.directory_model("", true).await.unwrap();
        let Some(Content::Listing(children)) = model.content else {
            panic!("expected listing");
        };
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "visible.txt");
        assert!(children[0].content.is_none());
    }

    #[tokio::test]
    async fn test_directory_listing_respects_policy() {
        struct NoTxt;
        impl VisibilityPolicy for NoTxt {
            fn should_list(&self, name: &str) -> bool {
                !name.ends_with(".txt")
            }
        }
        let (tmp, builder) = fixture_with_policy(Arc::new(NoTxt));
        std::fs::write(tmp.path().join("skip.txt"), "x").unwrap();
        std::fs::write(tmp.path().join("keep.md"), "x").unwrap();

        let model = builder.directory_model("", true).await.unwrap();
        let Some(Content::Listing(children)) = model.content else {
            panic!("expected listing");
        };
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "keep.md");
    }

    #[tokio::test]
    async fn test_document_model_trust_and_message() {
        let (tmp, builder) = fixture();
        let doc = Document::empty();
        std::fs::write(
            tmp.path().join("nb.ipynb"),
            serde_json::to_vec(&doc).unwrap(),
        )
        .unwrap();

        let model = builder.document_model("nb.ipynb", true).await.unwrap();
        assert_eq!(model.kind, EntryKind::Notebook);
        assert_eq!(model.format, Some(Format::Json));
        let Some(Content::Json(read)) = model.content else {
            panic!("expected document");
        };
        // Unsigned document reads back untrusted.
        assert_eq!(read.metadata["trusted"], serde_json::Value::Bool(false));
        assert!(model.message.is_none());
    }

    #[tokio::test]
    async fn test_writable_bit() {
        let (tmp, builder) = fixture();
        std::fs::write(tmp.path().join("rw.txt"), "x").unwrap();
        let model = builder.file_model("rw.txt", false, None).await.unwrap();
        assert!(model.writable);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(
                tmp.path().join("rw.txt"),
                std::fs::Permissions::from_mode(0o444),
            )
            .unwrap();
            let model = builder.file_model("rw.txt", false, None).await.unwrap();
            assert!(!model.writable);
        }
    }
}
