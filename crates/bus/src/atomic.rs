// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic JSON document IO.
//!
//! Every document the bus owns is replaced whole: serialize into a sibling
//! temp file, fsync, rename over the target. Readers either see the old
//! document or the new one, never a torn write.

use crate::BusError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Write `value` as pretty JSON via temp-file-and-rename.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), BusError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let tmp = path.with_file_name(format!("{file_name}.tmp"));

    let bytes = serde_json::to_vec_pretty(value)?;
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.write_all(b"\n")?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Read a JSON document, returning `default` when the file does not exist.
/// A present-but-malformed document is an error, not a silent reset.
pub fn read_json_or<T: DeserializeOwned>(path: &Path, default: T) -> Result<T, BusError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(default),
        Err(e) => Err(e.into()),
    }
}

/// Read a JSON document, returning `None` when the file does not exist.
pub fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, BusError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;
