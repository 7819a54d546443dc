// Copyright (c) 2026 The omnicm authors
// SPDX-License-Identifier: Apache-2.0

//! Public error taxonomy for the contents gateway.
//!
//! Every fault a caller can observe is a [`ContentsError`] variant, each
//! with a fixed HTTP-style status code for the surrounding server layer.
//! Backend faults are translated at the seam: the backend's permission
//! category becomes [`ContentsError::PermissionDenied`], everything else
//! passes through unchanged as [`ContentsError::Backend`]. That translation
//! is the `From<BackendError>` impl below, so every `?` on a backend call
//! is the guarded wrapper.

use thiserror::Error;

use crate::domain::storage::BackendError;

/// Faults surfaced by the contents gateway and its components.
#[derive(Debug, Error)]
pub enum ContentsError {
    /// Path escapes the configured root after translation.
    #[error("{0} is outside root contents directory")]
    OutsideRoot(String),

    /// Operation targets a hidden path where that is disallowed.
    #[error("invalid hidden file/directory: {0}")]
    HiddenPath(String),

    /// Expected a file and got a directory, or vice versa.
    #[error("not a {expected}: {path}")]
    WrongKind {
        path: String,
        expected: &'static str,
    },

    /// Required path is absent.
    #[error("{0} does not exist")]
    NotFound(String),

    /// Creation target already exists.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Rename target already exists.
    #[error("file or directory already exists: {0}")]
    Conflict(String),

    /// Directory deletion blocked by contents.
    #[error("directory not empty: {0}")]
    NotEmpty(String),

    /// Backend denied the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Content decode failure (bad base64, wrong format field).
    #[error("content encoding error for {path}: {reason}")]
    Encoding { path: String, reason: String },

    /// Text format requested but the bytes are not UTF-8.
    #[error("{0} is not UTF-8 encoded")]
    NotUtf8(String),

    /// Document deserialization failure.
    #[error("unreadable document {path}: {reason}")]
    Parse { path: String, reason: String },

    /// Underlying write or upload failure.
    #[error("unwritable file {path}: {reason}")]
    Write { path: String, reason: String },

    /// Save request is missing a required field.
    #[error("no {0} provided")]
    MissingField(&'static str),

    /// Save request carries a content type the gateway does not handle.
    #[error("unhandled content type: {0}")]
    UnhandledType(String),

    /// Unexpected failure during save, wrapping its cause.
    #[error("unexpected error while saving file: {path}")]
    Internal {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Backend fault with no more specific translation.
    #[error("storage backend error: {0}")]
    Backend(#[source] BackendError),
}

impl ContentsError {
    /// HTTP-style status code for the server boundary.
    pub fn status(&self) -> u16 {
        match self {
            ContentsError::OutsideRoot(_) | ContentsError::NotFound(_) => 404,
            ContentsError::PermissionDenied(_) => 403,
            ContentsError::Conflict(_) => 409,
            ContentsError::Internal { .. } | ContentsError::Backend(_) => 500,
            _ => 400,
        }
    }
}

impl From<BackendError> for ContentsError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::PermissionDenied(msg) => ContentsError::PermissionDenied(msg),
            other => ContentsError::Backend(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ContentsError::NotFound("a".into()).status(), 404);
        assert_eq!(ContentsError::OutsideRoot("../x".into()).status(), 404);
        assert_eq!(ContentsError::PermissionDenied("x".into()).status(), 403);
        assert_eq!(ContentsError::Conflict("b".into()).status(), 409);
        assert_eq!(ContentsError::HiddenPath(".x".into()).status(), 400);
        assert_eq!(ContentsError::MissingField("type").status(), 400);
        assert_eq!(
            ContentsError::Backend(BackendError::Timeout).status(),
            500
        );
    }

    #[test]
    fn test_permission_translation() {
        let err: ContentsError = BackendError::PermissionDenied("denied".into()).into();
        assert!(matches!(err, ContentsError::PermissionDenied(_)));

        let err: ContentsError = BackendError::NotFound("/x".into()).into();
        assert!(matches!(err, ContentsError::Backend(BackendError::NotFound(_))));
    }
}
