// Copyright (c) 2026 The omnicm authors
// SPDX-License-Identifier: Apache-2.0

//! Startup configuration.
//!
//! Consumed once when the gateway is constructed; the root in particular is
//! resolved to an immutable value at that point and never revisited.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Default checkpoint copy chunk size: 64 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Default sibling directory name for checkpoints.
pub const DEFAULT_CHECKPOINT_DIR: &str = ".ipynb_checkpoints";

/// Which backend adapter to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendDriver {
    /// WebHDFS REST adapter (production).
    Webhdfs,
    /// Local filesystem adapter (development/testing).
    Local,
}

/// Backend connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Namenode host; `default` asks the cluster configuration.
    pub host: String,
    /// Namenode port; 0 for the default or logical (HA) endpoint.
    pub port: u16,
    /// Username when connecting; `None` implies the login user.
    pub user: Option<String>,
    /// Credential reference (e.g. a Kerberos ticket cache path).
    pub kerb_ticket: Option<String>,
    pub driver: BackendDriver,
    /// Extra key/value overrides passed to the adapter
    /// (e.g. `base_path` for the local driver).
    pub extra: HashMap<String, String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: "default".to_string(),
            port: 0,
            user: None,
            kerb_ticket: None,
            driver: BackendDriver::Webhdfs,
            extra: HashMap::new(),
        }
    }
}

/// Gateway configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Native root directory; `None` resolves to the backend's home.
    pub root: Option<String>,
    /// Sibling directory name for checkpoints.
    pub checkpoint_dir: String,
    /// Chunk size for streamed checkpoint copies, in bytes.
    pub checkpoint_chunk_size: usize,
    pub backend: BackendConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            root: None,
            checkpoint_dir: DEFAULT_CHECKPOINT_DIR.to_string(),
            checkpoint_chunk_size: DEFAULT_CHUNK_SIZE,
            backend: BackendConfig::default(),
        }
    }
}
