// Copyright (c) 2026 The omnicm authors
// SPDX-License-Identifier: Apache-2.0

//! The contents gateway façade.
//!
//! The only component the front end calls directly. Each call is validated,
//! performed, and answered with a freshly built model; no state is carried
//! across calls beyond the immutable root.

use std::sync::Arc;

use tracing::debug;

use crate::config::GatewayConfig;
use crate::domain::document::DocumentCodec;
use crate::domain::entry::{EntryKind, EntryModel, Format, SaveContent, SaveRequest, CHECKPOINT_ID};
use crate::domain::error::ContentsError;
use crate::domain::paths::PathMapper;
use crate::domain::policy::{ListAll, NoopHook, PreSaveHook, VisibilityPolicy};
use crate::domain::storage::DfsBackend;
use crate::infrastructure::checkpoints::CheckpointStore;
use crate::infrastructure::codec::NotebookCodec;
use crate::infrastructure::io::SafeIo;
use crate::infrastructure::model::ModelBuilder;

/// Permission mode for directories created through save.
const DIRECTORY_MODE: u32 = 0o770;

/// Collaborators the front end may replace.
pub struct Collaborators {
    pub codec: Arc<dyn DocumentCodec>,
    pub policy: Arc<dyn VisibilityPolicy>,
    pub hook: Arc<dyn PreSaveHook>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            codec: Arc::new(NotebookCodec::new(b"omnicm-notary".to_vec())),
            policy: Arc::new(ListAll),
            hook: Arc::new(NoopHook),
        }
    }
}

/// Top-level contents gateway.
pub struct ContentGateway {
    backend: Arc<dyn DfsBackend>,
    mapper: PathMapper,
    io: SafeIo,
    models: ModelBuilder,
    checkpoints: CheckpointStore,
    hook: Arc<dyn PreSaveHook>,
}

impl ContentGateway {
    /// Construct a gateway over an already-connected backend, resolving the
    /// root once: the configured value, or the backend's reported home.
    pub async fn connect(
        config: &GatewayConfig,
        backend: Arc<dyn DfsBackend>,
    ) -> Result<Self, ContentsError> {
        Self::with_collaborators(config, backend, Collaborators::default()).await
    }

    /// As [`ContentGateway::connect`], with replaced collaborators.
    pub async fn with_collaborators(
        config: &GatewayConfig,
        backend: Arc<dyn DfsBackend>,
        collaborators: Collaborators,
    ) -> Result<Self, ContentsError> {
        let root = match &config.root {
            Some(root) => root.clone(),
            None => backend.home().await?,
        };
        let mapper = PathMapper::new(root);
        debug!(root = %mapper.root(), "contents gateway root resolved");

        let io = SafeIo::new(backend.clone(), mapper.clone(), collaborators.codec);
        let models = ModelBuilder::new(io.clone(), collaborators.policy);
        let checkpoints = CheckpointStore::new(
            backend.clone(),
            mapper.clone(),
            config.checkpoint_dir.clone(),
            config.checkpoint_chunk_size,
        );
        Ok(Self {
            backend,
            mapper,
            io,
            models,
            checkpoints,
            hook: collaborators.hook,
        })
    }

    /// The resolved native root.
    pub fn root(&self) -> &str {
        self.mapper.root()
    }

    /// Diagnostic line for startup logging.
    pub fn info_string(&self) -> String {
        format!("Serving contents from backend directory: {}", self.root())
    }

    /// The checkpoint store; the front end drives restore/list/delete
    /// directly.
    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    /// Is the path hidden (any component starting with `.`)?
    pub fn is_hidden(&self, api_path: &str) -> bool {
        self.mapper.is_hidden(api_path)
    }

    /// Does anything exist at the path?
    pub async fn exists(&self, api_path: &str) -> Result<bool, ContentsError> {
        let native = self.mapper.to_native(api_path)?;
        Ok(self.backend.exists(&native).await?)
    }

    /// Does a directory exist at the path?
    pub async fn dir_exists(&self, api_path: &str) -> Result<bool, ContentsError> {
        let native = self.mapper.to_native(api_path)?;
        Ok(self.backend.is_dir(&native).await?)
    }

    /// Does a file exist at the path?
    pub async fn file_exists(&self, api_path: &str) -> Result<bool, ContentsError> {
        let native = self.mapper.to_native(api_path)?;
        Ok(self.backend.is_file(&native).await?)
    }

    /// Get a file, directory, or notebook model.
    pub async fn get(
        &self,
        api_path: &str,
        with_content: bool,
        hint: Option<EntryKind>,
        format: Option<Format>,
    ) -> Result<EntryModel, ContentsError> {
        self.models.build(api_path, with_content, hint, format).await
    }

    /// Save a model to a path and return the content-less result model.
    pub async fn save(
        &self,
        request: &SaveRequest,
        api_path: &str,
    ) -> Result<EntryModel, ContentsError> {
        self.io.ensure_valid(api_path, None, false).await?;
        let kind = request
            .kind
            .as_deref()
            .ok_or(ContentsError::MissingField("type"))?;
        if request.content.is_none() && kind != "directory" {
            return Err(ContentsError::MissingField("content"));
        }
        self.hook.on_save(request, api_path);

        let validation_message = self
            .dispatch_save(request, kind, api_path)
            .await
            .map_err(|err| match err {
                // Backend faults with no taxonomy translation are the
                // unexpected category during save.
                ContentsError::Backend(cause) => ContentsError::Internal {
                    path: api_path.to_string(),
                    source: Box::new(cause),
                },
                other => other,
            })?;

        let mut model = self.get(api_path, false, None, None).await?;
        if validation_message.is_some() {
            model.message = validation_message;
        }
        Ok(model)
    }

    async fn dispatch_save(
        &self,
        request: &SaveRequest,
        kind: &str,
        api_path: &str,
    ) -> Result<Option<String>, ContentsError> {
        match kind {
            "notebook" => {
                let Some(SaveContent::Json(doc)) = &request.content else {
                    return Err(ContentsError::Parse {
                        path: api_path.to_string(),
                        reason: "notebook content must be a JSON document".to_string(),
                    });
                };
                let mut doc = doc.clone();
                self.io.codec().sign(&mut doc, api_path);
                self.io.write_document(api_path, &doc).await?;
                // One checkpoint should always exist for notebooks.
                if self.checkpoints.list(api_path).await?.is_empty() {
                    self.checkpoints.create(api_path).await?;
                }
                Ok(self.io.codec().validate(&doc))
            }
            "file" => {
                let Some(SaveContent::Text(content)) = &request.content else {
                    return Err(ContentsError::Encoding {
                        path: api_path.to_string(),
                        reason: "file content must be a string".to_string(),
                    });
                };
                let format = request.format.ok_or(ContentsError::MissingField("format"))?;
                self.io.write_raw_file(api_path, content, format).await?;
                Ok(None)
            }
            "directory" => {
                self.io.create_directory(api_path, DIRECTORY_MODE).await?;
                Ok(None)
            }
            other => Err(ContentsError::UnhandledType(other.to_string())),
        }
    }

    /// Delete the file or directory at the path.
    ///
    /// Directories must be empty; deleting a file also drops its checkpoint
    /// slot, if any.
    pub async fn delete_entry(&self, api_path: &str) -> Result<(), ContentsError> {
        if !self.exists(api_path).await? {
            return Err(ContentsError::NotFound(api_path.to_string()));
        }
        if self.mapper.is_hidden(api_path) {
            return Err(ContentsError::HiddenPath(api_path.to_string()));
        }
        let native = self.mapper.to_native(api_path)?;
        if self.backend.is_file(&native).await? {
            self.backend.delete(&native).await?;
            if !self.checkpoints.list(api_path).await?.is_empty() {
                self.checkpoints.delete(CHECKPOINT_ID, api_path).await?;
            }
        } else {
            if !self.backend.list(&native).await?.is_empty() {
                return Err(ContentsError::NotEmpty(api_path.to_string()));
            }
            self.backend.delete(&native).await?;
        }
        Ok(())
    }

    /// Rename a file or directory, carrying its checkpoint slot along.
    pub async fn rename_entry(
        &self,
        old_path: &str,
        new_path: &str,
    ) -> Result<(), ContentsError> {
        if !self.exists(old_path).await? {
            return Err(ContentsError::NotFound(old_path.to_string()));
        }
        if self.mapper.is_hidden(old_path) {
            return Err(ContentsError::HiddenPath(old_path.to_string()));
        }
        if self.mapper.is_hidden(new_path) {
            return Err(ContentsError::HiddenPath(new_path.to_string()));
        }
        if self.exists(new_path).await? {
            return Err(ContentsError::Conflict(new_path.to_string()));
        }
        let old_native = self.mapper.to_native(old_path)?;
        let new_native = self.mapper.to_native(new_path)?;
        self.backend.rename(&old_native, &new_native).await?;
        self.checkpoints
            .rename(CHECKPOINT_ID, old_path, new_path)
            .await?;
        Ok(())
    }
}
