// Copyright (c) 2026 The omnicm authors
// SPDX-License-Identifier: Apache-2.0

//! Backend adapters.
//!
//! Concrete [`DfsBackend`](crate::domain::storage::DfsBackend)
//! implementations: the WebHDFS REST adapter for production clusters and a
//! local-filesystem adapter for development and testing.

pub mod local;
pub mod webhdfs;

pub use local::LocalDfsBackend;
pub use webhdfs::WebHdfsBackend;

use std::sync::Arc;

use crate::config::{BackendConfig, BackendDriver};
use crate::domain::storage::{BackendError, DfsBackend};

/// Construct a backend from connection configuration.
pub fn create_backend(config: &BackendConfig) -> Result<Arc<dyn DfsBackend>, BackendError> {
    match config.driver {
        BackendDriver::Local => {
            let base = config
                .extra
                .get("base_path")
                .cloned()
                .unwrap_or_else(|| "/tmp/omnicm".to_string());
            Ok(Arc::new(LocalDfsBackend::new(base)?))
        }
        BackendDriver::Webhdfs => Ok(Arc::new(WebHdfsBackend::new(
            &config.host,
            config.port,
            config.user.clone(),
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_factory_local() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = BackendConfig {
            driver: BackendDriver::Local,
            extra: HashMap::from([(
                "base_path".to_string(),
                tmp.path().to_str().unwrap().to_string(),
            )]),
            ..Default::default()
        };
        assert!(create_backend(&config).is_ok());
    }

    #[test]
    fn test_factory_webhdfs() {
        let config = BackendConfig {
            driver: BackendDriver::Webhdfs,
            host: "namenode".to_string(),
            port: 9870,
            ..Default::default()
        };
        assert!(create_backend(&config).is_ok());
    }
}
