// Copyright (c) 2026 The omnicm authors
// SPDX-License-Identifier: Apache-2.0

//! Domain layer: business rules with no I/O of their own.

pub mod document;
pub mod entry;
pub mod error;
pub mod paths;
pub mod policy;
pub mod storage;
