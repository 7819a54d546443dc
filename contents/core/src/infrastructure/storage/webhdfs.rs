// Copyright (c) 2026 The omnicm authors
// SPDX-License-Identifier: Apache-2.0

//! WebHDFS Storage Backend Implementation
//!
//! Provides HDFS-backed storage over the WebHDFS REST API exposed by a
//! NameNode, implementing the DfsBackend trait as an Anti-Corruption Layer.
//!
//! # API Endpoints
//!
//! - `GET  ?op=GETFILESTATUS` - Stat a path
//! - `GET  ?op=LISTSTATUS` - List a directory
//! - `GET  ?op=OPEN&offset=N&length=N` - Read a byte range (307 to datanode)
//! - `PUT  ?op=CREATE&overwrite=true` - Create a file (307 to datanode)
//! - `PUT  ?op=MKDIRS` - Create directories
//! - `PUT  ?op=SETPERMISSION&permission=OCTAL` - Chmod
//! - `PUT  ?op=RENAME&destination=/path` - Rename
//! - `DELETE ?op=DELETE&recursive=true` - Delete
//! - `GET  ?op=GETHOMEDIRECTORY` - User home directory
//!
//! Writes are buffered client-side: `open(Create)` allocates a buffer,
//! `write_at` fills it, and `close` performs the two-step CREATE dance
//! (NameNode redirect, then body upload to the DataNode).

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::domain::storage::{
    BackendError, DfsBackend, FileHandle, FileInfo, FileKind, OpenMode,
};

/// Default request timeout for NameNode operations.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client-side state for an open file.
struct OpenFile {
    path: String,
    mode: OpenMode,
    /// Pending write buffer, flushed on close. Empty for read handles.
    buffer: Vec<u8>,
}

/// WebHDFS NameNode adapter.
pub struct WebHdfsBackend {
    /// HTTP client for communicating with the NameNode and DataNodes.
    client: Client,

    /// NameNode base URL (e.g., "http://namenode:9870").
    base_url: String,

    /// Value for the `user.name` query parameter, if any.
    user: Option<String>,

    /// Open file table, keyed by opaque handle bytes.
    handles: Mutex<HashMap<Vec<u8>, OpenFile>>,
}

impl WebHdfsBackend {
    /// Create a new WebHDFS adapter.
    ///
    /// Redirects are handled manually so the two-step CREATE and OPEN
    /// protocols can target the DataNode the NameNode names.
    pub fn new(host: &str, port: u16, user: Option<String>) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .redirect(Policy::none())
            .build()
            .map_err(BackendError::from)?;

        Ok(Self {
            client,
            base_url: format!("http://{}:{}", host, port),
            user,
            handles: Mutex::new(HashMap::new()),
        })
    }

    /// Build the full URL for a filesystem path and operation.
    fn build_url(&self, path: &str, op: &str) -> String {
        format!("{}/webhdfs/v1{}?op={}", self.base_url, path, op)
    }

    /// Query parameters common to every request.
    fn common_params(&self) -> Vec<(&'static str, String)> {
        match &self.user {
            Some(user) => vec![("user.name", user.clone())],
            None => Vec::new(),
        }
    }

    /// Follow a single NameNode redirect, returning the DataNode location.
    fn redirect_location(response: &reqwest::Response) -> Result<String, BackendError> {
        response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| {
                BackendError::Unknown("redirect response without Location header".to_string())
            })
    }

    /// Translate a non-success response into a BackendError.
    async fn error_from(path: &str, response: reqwest::Response) -> BackendError {
        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => BackendError::NotFound(path.to_string()),
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                BackendError::PermissionDenied(path.to_string())
            }
            _ => {
                let detail = match response.json::<RemoteExceptionEnvelope>().await {
                    Ok(envelope) => envelope.remote_exception.message,
                    Err(_) => format!("HTTP {}", status),
                };
                BackendError::Unknown(format!("{}: {}", path, detail))
            }
        }
    }

    async fn file_status(&self, path: &str) -> Result<FileStatus, BackendError> {
        let url = self.build_url(path, "GETFILESTATUS");
        let response = self
            .client
            .get(&url)
            .query(&self.common_params())
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Self::error_from(path, response).await);
        }
        let envelope: FileStatusEnvelope = response.json().await?;
        Ok(envelope.file_status)
    }

    /// Two-step file creation: NameNode redirect, then body to the DataNode.
    async fn create_file(&self, path: &str, body: Vec<u8>) -> Result<(), BackendError> {
        let url = self.build_url(path, "CREATE");
        let mut params = self.common_params();
        params.push(("overwrite", "true".to_string()));

        let response = self.client.put(&url).query(&params).send().await?;
        if response.status() != StatusCode::TEMPORARY_REDIRECT {
            return Err(Self::error_from(path, response).await);
        }
        let location = Self::redirect_location(&response)?;
        debug!(path, location = %location, "uploading to datanode");

        let response = self.client.put(&location).body(body).send().await?;
        match response.status() {
            StatusCode::CREATED | StatusCode::OK => Ok(()),
            _ => Err(Self::error_from(path, response).await),
        }
    }
}

impl From<&FileStatus> for FileInfo {
    fn from(status: &FileStatus) -> Self {
        FileInfo {
            kind: if status.entry_type == "DIRECTORY" {
                FileKind::Directory
            } else {
                FileKind::File
            },
            size: status.length,
            last_modified: status.modification_time / 1000,
            last_accessed: status.access_time / 1000,
            permissions: u32::from_str_radix(&status.permission, 8).ok(),
        }
    }
}

#[async_trait]
impl DfsBackend for WebHdfsBackend {
    async fn exists(&self, path: &str) -> Result<bool, BackendError> {
        match self.file_status(path).await {
            Ok(_) => Ok(true),
            Err(BackendError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn is_dir(&self, path: &str) -> Result<bool, BackendError> {
        match self.file_status(path).await {
            Ok(status) => Ok(status.entry_type == "DIRECTORY"),
            Err(BackendError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn is_file(&self, path: &str) -> Result<bool, BackendError> {
        match self.file_status(path).await {
            Ok(status) => Ok(status.entry_type == "FILE"),
            Err(BackendError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn info(&self, path: &str) -> Result<FileInfo, BackendError> {
        let status = self.file_status(path).await?;
        Ok(FileInfo::from(&status))
    }

    async fn list(&self, path: &str) -> Result<Vec<String>, BackendError> {
        let url = self.build_url(path, "LISTSTATUS");
        let response = self
            .client
            .get(&url)
            .query(&self.common_params())
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Self::error_from(path, response).await);
        }
        let envelope: ListStatusEnvelope = response.json().await?;

        let parent = path.trim_end_matches('/');
        Ok(envelope
            .file_statuses
            .file_status
            .into_iter()
            .map(|status| format!("{}/{}", parent, status.path_suffix))
            .collect())
    }

    async fn open(&self, path: &str, mode: OpenMode) -> Result<FileHandle, BackendError> {
        if mode == OpenMode::Read && !self.exists(path).await? {
            return Err(BackendError::NotFound(path.to_string()));
        }
        let handle = FileHandle(Uuid::new_v4().as_bytes().to_vec());
        self.handles.lock().insert(
            handle.0.clone(),
            OpenFile {
                path: path.to_string(),
                mode,
                buffer: Vec::new(),
            },
        );
        Ok(handle)
    }

    async fn read_at(
        &self,
        handle: &FileHandle,
        offset: u64,
        length: usize,
    ) -> Result<Vec<u8>, BackendError> {
        let path = {
            let table = self.handles.lock();
            let open = table.get(&handle.0).ok_or(BackendError::InvalidHandle)?;
            open.path.clone()
        };

        let url = self.build_url(&path, "OPEN");
        let mut params = self.common_params();
        params.push(("offset", offset.to_string()));
        params.push(("length", length.to_string()));

        let response = self.client.get(&url).query(&params).send().await?;
        let response = if response.status() == StatusCode::TEMPORARY_REDIRECT {
            let location = Self::redirect_location(&response)?;
            self.client.get(&location).send().await?
        } else {
            response
        };

        match response.status() {
            StatusCode::OK | StatusCode::PARTIAL_CONTENT => {
                Ok(response.bytes().await?.to_vec())
            }
            // Reading at or past EOF yields no data rather than an error.
            StatusCode::RANGE_NOT_SATISFIABLE => Ok(Vec::new()),
            _ => Err(Self::error_from(&path, response).await),
        }
    }

    async fn write_at(
        &self,
        handle: &FileHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<usize, BackendError> {
        let mut table = self.handles.lock();
        let open = table.get_mut(&handle.0).ok_or(BackendError::InvalidHandle)?;
        if open.mode != OpenMode::Create {
            return Err(BackendError::InvalidHandle);
        }

        let end = offset as usize + data.len();
        if open.buffer.len() < end {
            open.buffer.resize(end, 0);
        }
        open.buffer[offset as usize..end].copy_from_slice(data);
        Ok(data.len())
    }

    async fn close(&self, handle: FileHandle) -> Result<(), BackendError> {
        let open = self
            .handles
            .lock()
            .remove(&handle.0)
            .ok_or(BackendError::InvalidHandle)?;

        match open.mode {
            OpenMode::Read => Ok(()),
            OpenMode::Create => self.create_file(&open.path, open.buffer).await,
        }
    }

    async fn upload(&self, path: &str, local: &Path) -> Result<(), BackendError> {
        let body = std::fs::read(local)?;
        self.create_file(path, body).await
    }

    async fn mkdir(&self, path: &str) -> Result<(), BackendError> {
        let url = self.build_url(path, "MKDIRS");
        let response = self
            .client
            .put(&url)
            .query(&self.common_params())
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Self::error_from(path, response).await);
        }
        Ok(())
    }

    async fn chmod(&self, path: &str, mode: u32) -> Result<(), BackendError> {
        let url = self.build_url(path, "SETPERMISSION");
        let mut params = self.common_params();
        params.push(("permission", format!("{:o}", mode)));

        let response = self.client.put(&url).query(&params).send().await?;
        if response.status() != StatusCode::OK {
            return Err(Self::error_from(path, response).await);
        }
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), BackendError> {
        let url = self.build_url(from, "RENAME");
        let mut params = self.common_params();
        params.push(("destination", to.to_string()));

        let response = self.client.put(&url).query(&params).send().await?;
        if response.status() != StatusCode::OK {
            return Err(Self::error_from(from, response).await);
        }
        let result: BooleanEnvelope = response.json().await?;
        if !result.boolean {
            return Err(BackendError::Unknown(format!(
                "rename {} -> {} refused by namenode",
                from, to
            )));
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), BackendError> {
        let url = self.build_url(path, "DELETE");
        let mut params = self.common_params();
        params.push(("recursive", "true".to_string()));

        let response = self.client.delete(&url).query(&params).send().await?;
        if response.status() != StatusCode::OK {
            return Err(Self::error_from(path, response).await);
        }
        let result: BooleanEnvelope = response.json().await?;
        if !result.boolean {
            return Err(BackendError::NotFound(path.to_string()));
        }
        Ok(())
    }

    async fn home(&self) -> Result<String, BackendError> {
        let url = self.build_url("/", "GETHOMEDIRECTORY");
        let response = self
            .client
            .get(&url)
            .query(&self.common_params())
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Self::error_from("/", response).await);
        }
        let envelope: PathEnvelope = response.json().await?;
        Ok(envelope.path)
    }
}

// ============================================================================
// WebHDFS API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct FileStatusEnvelope {
    #[serde(rename = "FileStatus")]
    file_status: FileStatus,
}

#[derive(Debug, Deserialize)]
struct ListStatusEnvelope {
    #[serde(rename = "FileStatuses")]
    file_statuses: FileStatuses,
}

#[derive(Debug, Deserialize)]
struct FileStatuses {
    #[serde(rename = "FileStatus")]
    file_status: Vec<FileStatus>,
}

#[derive(Debug, Deserialize)]
struct FileStatus {
    #[serde(rename = "type")]
    entry_type: String,

    length: u64,

    #[serde(rename = "modificationTime")]
    modification_time: i64,

    #[serde(rename = "accessTime")]
    access_time: i64,

    permission: String,

    #[serde(rename = "pathSuffix", default)]
    path_suffix: String,
}

#[derive(Debug, Deserialize)]
struct BooleanEnvelope {
    boolean: bool,
}

#[derive(Debug, Deserialize)]
struct PathEnvelope {
    #[serde(rename = "Path")]
    path: String,
}

#[derive(Debug, Deserialize)]
struct RemoteExceptionEnvelope {
    #[serde(rename = "RemoteException")]
    remote_exception: RemoteException,
}

#[derive(Debug, Deserialize)]
struct RemoteException {
    #[allow(dead_code)]
    exception: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_creation() {
        let backend = WebHdfsBackend::new("namenode", 9870, None).unwrap();
        assert_eq!(backend.base_url, "http://namenode:9870");
    }

    #[test]
    fn test_url_building() {
        let backend = WebHdfsBackend::new("namenode", 9870, None).unwrap();
        assert_eq!(
            backend.build_url("/user/alice/nb.ipynb", "GETFILESTATUS"),
            "http://namenode:9870/webhdfs/v1/user/alice/nb.ipynb?op=GETFILESTATUS"
        );
        assert_eq!(
            backend.build_url("/", "GETHOMEDIRECTORY"),
            "http://namenode:9870/webhdfs/v1/?op=GETHOMEDIRECTORY"
        );
    }

    #[test]
    fn test_user_param_presence() {
        let anonymous = WebHdfsBackend::new("namenode", 9870, None).unwrap();
        assert!(anonymous.common_params().is_empty());

        let named = WebHdfsBackend::new("namenode", 9870, Some("alice".to_string())).unwrap();
        assert_eq!(
            named.common_params(),
            vec![("user.name", "alice".to_string())]
        );
    }

    #[test]
    fn test_file_status_translation() {
        let raw = r#"{
            "FileStatus": {
                "type": "FILE",
                "length": 12,
                "modificationTime": 1700000000000,
                "accessTime": 1700000001000,
                "permission": "644",
                "pathSuffix": ""
            }
        }"#;
        let envelope: FileStatusEnvelope = serde_json::from_str(raw).unwrap();
        let info = FileInfo::from(&envelope.file_status);
        assert_eq!(info.kind, FileKind::File);
        assert_eq!(info.size, 12);
        assert_eq!(info.last_modified, 1_700_000_000);
        assert_eq!(info.permissions, Some(0o644));
    }

    #[test]
    fn test_liststatus_parsing() {
        let raw = r#"{
            "FileStatuses": {
                "FileStatus": [
                    {"type": "DIRECTORY", "length": 0, "modificationTime": 0,
                     "accessTime": 0, "permission": "770", "pathSuffix": "sub"},
                    {"type": "FILE", "length": 5, "modificationTime": 0,
                     "accessTime": 0, "permission": "644", "pathSuffix": "a.txt"}
                ]
            }
        }"#;
        let envelope: ListStatusEnvelope = serde_json::from_str(raw).unwrap();
        let names: Vec<&str> = envelope
            .file_statuses
            .file_status
            .iter()
            .map(|s| s.path_suffix.as_str())
            .collect();
        assert_eq!(names, vec!["sub", "a.txt"]);
    }

    #[tokio::test]
    async fn test_buffered_write_assembles_at_offsets() {
        let backend = WebHdfsBackend::new("namenode", 9870, None).unwrap();
        let handle = FileHandle(vec![1, 2, 3]);
        backend.handles.lock().insert(
            handle.0.clone(),
            OpenFile {
                path: "/f".to_string(),
                mode: OpenMode::Create,
                buffer: Vec::new(),
            },
        );

        backend.write_at(&handle, 6, b"world").await.unwrap();
        backend.write_at(&handle, 0, b"hello ").await.unwrap();

        let table = backend.handles.lock();
        assert_eq!(table.get(&handle.0).unwrap().buffer, b"hello world");
    }

    #[tokio::test]
    async fn test_write_to_read_handle_rejected() {
        let backend = WebHdfsBackend::new("namenode", 9870, None).unwrap();
        let handle = FileHandle(vec![9]);
        backend.handles.lock().insert(
            handle.0.clone(),
            OpenFile {
                path: "/f".to_string(),
                mode: OpenMode::Read,
                buffer: Vec::new(),
            },
        );

        let result = backend.write_at(&handle, 0, b"x").await;
        assert!(matches!(result, Err(BackendError::InvalidHandle)));
    }

    // Integration tests require a running HDFS cluster with WebHDFS enabled.
    // Run manually with: cargo test --package omnicm-core --lib -- --ignored

    #[tokio::test]
    #[ignore]
    async fn integration_test_file_lifecycle() {
        let backend = WebHdfsBackend::new("localhost", 9870, Some("hdfs".to_string())).unwrap();

        let dir = "/tmp/omnicm-it";
        let file = "/tmp/omnicm-it/hello.txt";

        backend.mkdir(dir).await.unwrap();

        let handle = backend.open(file, OpenMode::Create).await.unwrap();
        backend.write_at(&handle, 0, b"hello hdfs").await.unwrap();
        backend.close(handle).await.unwrap();

        assert!(backend.is_file(file).await.unwrap());
        assert_eq!(backend.read_all(file).await.unwrap(), b"hello hdfs");

        backend.delete(dir).await.unwrap();
        assert!(!backend.exists(dir).await.unwrap());
    }
}
