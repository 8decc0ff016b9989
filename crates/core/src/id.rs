// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run identifier.

crate::string_id! {
    /// Unique identifier for a coordinator run.
    ///
    /// Stamped into every journal event so multiple runs sharing a directory
    /// tree can be told apart after the fact.
    pub struct RunId;
}

impl RunId {
    /// Generate a fresh run id of the form `run_<12 hex chars>`.
    pub fn generate() -> Self {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("run_{}", &hex[..12]))
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::generate()
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
