// Copyright (c) 2026 The omnicm authors
// SPDX-License-Identifier: Apache-2.0

//! Path mapping between the API namespace and the backend namespace.
//!
//! API paths are client-facing: forward-slash separated, relative to the
//! configured root, possibly empty (the root itself). Native paths are the
//! backend's own absolute paths. Every native path handed to the backend
//! MUST start with the root prefix; a translation that escapes the root is
//! a containment fault, never silently tolerated.

use crate::domain::error::ContentsError;

/// Bidirectional API-path / native-path translator, fixed to one root.
#[derive(Debug, Clone)]
pub struct PathMapper {
    root: String,
}

impl PathMapper {
    /// Create a mapper over an absolute native root.
    pub fn new(root: impl Into<String>) -> Self {
        let mut root = root.into();
        while root.len() > 1 && root.ends_with('/') {
            root.pop();
        }
        Self { root }
    }

    /// The configured native root.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Given an API path, return its native path.
    ///
    /// `.` segments are dropped and `..` segments are resolved lexically;
    /// a path that resolves past the root fails with
    /// [`ContentsError::OutsideRoot`].
    pub fn to_native(&self, api_path: &str) -> Result<String, ContentsError> {
        let mut parts: Vec<&str> = Vec::new();
        for segment in api_path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if parts.pop().is_none() {
                        return Err(ContentsError::OutsideRoot(api_path.to_string()));
                    }
                }
                other => parts.push(other),
            }
        }
        let native = if parts.is_empty() {
            self.root.clone()
        } else if self.root == "/" {
            format!("/{}", parts.join("/"))
        } else {
            format!("{}/{}", self.root, parts.join("/"))
        };
        // Containment invariant, kept explicit even though the join above
        // cannot violate it.
        if !native.starts_with(&self.root) {
            return Err(ContentsError::OutsideRoot(api_path.to_string()));
        }
        Ok(native)
    }

    /// Given a native path, return its API path.
    ///
    /// Inverse of [`PathMapper::to_native`] for every path it produced.
    pub fn to_api(&self, native_path: &str) -> Result<String, ContentsError> {
        let rest = native_path
            .strip_prefix(&self.root)
            .ok_or_else(|| ContentsError::OutsideRoot(native_path.to_string()))?;
        if !rest.is_empty() && !rest.starts_with('/') && self.root != "/" {
            // "/rootx/file" is not under "/root".
            return Err(ContentsError::OutsideRoot(native_path.to_string()));
        }
        Ok(rest.trim_matches('/').to_string())
    }

    /// True iff any `/`-delimited component starts with `.`.
    pub fn is_hidden(&self, api_path: &str) -> bool {
        api_path
            .split('/')
            .any(|part| part.starts_with('.'))
    }

    /// Canonical form of an API path: no leading/trailing slashes, no empty
    /// or `.` components.
    pub fn normalize(api_path: &str) -> String {
        api_path
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Final component of an API path; empty for the root.
    pub fn basename(api_path: &str) -> &str {
        api_path
            .trim_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("")
    }

    /// Split an API path into `(parent, name)`.
    pub fn split(api_path: &str) -> (&str, &str) {
        let trimmed = api_path.trim_matches('/');
        match trimmed.rsplit_once('/') {
            Some((parent, name)) => (parent, name),
            None => ("", trimmed),
        }
    }

    /// Join a child name onto an API path.
    pub fn join(api_path: &str, name: &str) -> String {
        let trimmed = api_path.trim_matches('/');
        if trimmed.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", trimmed, name)
        }
    }
}
