// Copyright (c) 2026 The omnicm authors
// SPDX-License-Identifier: Apache-2.0

//! omnicm core — a contents gateway for distributed filesystems.
//!
//! Lets a document-editing front end persist and retrieve hierarchical
//! documents (notebooks, plain files, directories) against a distributed
//! filesystem backend instead of a local disk.
//!
//! # Architecture
//!
//! - **Domain layer** (`domain`): path mapping and containment rules, the
//!   backend abstraction, model types, the document format, and the public
//!   error taxonomy.
//! - **Infrastructure layer** (`infrastructure`): guarded I/O primitives,
//!   model building, the single-slot checkpoint store, backend adapters,
//!   and the [`ContentGateway`](infrastructure::gateway::ContentGateway)
//!   façade that the front end calls.

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::GatewayConfig;
pub use domain::entry::{CheckpointRecord, Content, EntryKind, EntryModel, Format, SaveRequest};
pub use domain::error::ContentsError;
pub use domain::paths::PathMapper;
pub use domain::storage::{BackendError, DfsBackend};
pub use infrastructure::gateway::ContentGateway;
