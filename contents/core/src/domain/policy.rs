// Copyright (c) 2026 The omnicm authors
// SPDX-License-Identifier: Apache-2.0

//! Front-end collaborator seams: listing visibility and the pre-save hook.

use crate::domain::entry::SaveRequest;

/// Decides whether a directory entry is shown in listings.
///
/// Hidden-path filtering is separate and always applies; this policy only
/// covers the front end's extra exclusions (glob lists and the like).
pub trait VisibilityPolicy: Send + Sync {
    fn should_list(&self, name: &str) -> bool;
}

/// Default policy: list everything.
#[derive(Debug, Default)]
pub struct ListAll;

impl VisibilityPolicy for ListAll {
    fn should_list(&self, _name: &str) -> bool {
        true
    }
}

/// Invoked before any bytes are written during a save.
pub trait PreSaveHook: Send + Sync {
    fn on_save(&self, request: &SaveRequest, api_path: &str);
}

/// Default hook: does nothing.
#[derive(Debug, Default)]
pub struct NoopHook;

impl PreSaveHook for NoopHook {
    fn on_save(&self, _request: &SaveRequest, _api_path: &str) {}
}
