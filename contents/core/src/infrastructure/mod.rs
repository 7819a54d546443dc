// Copyright (c) 2026 The omnicm authors
// SPDX-License-Identifier: Apache-2.0

//! Infrastructure layer: guarded I/O, model building, checkpoints, the
//! gateway façade, and the concrete backend adapters.

pub mod checkpoints;
pub mod codec;
pub mod gateway;
pub mod io;
pub mod model;
pub mod storage;
