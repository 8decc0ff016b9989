// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory file locks.
//!
//! A [`FileLock`] is a scoped acquisition of the named lock file: exclusive
//! for the lifetime of the guard, released on every exit path including
//! errors and panics. Cross-process synchronization only: within the
//! coordinator, state is single-owner and needs no locking.

use crate::BusError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Exclusive advisory lock held for the guard's lifetime.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Block until the named lock is held.
    pub fn acquire(path: &Path) -> Result<Self, BusError> {
        let file = OpenOptions::new().create(true).truncate(false).read(true).write(true).open(path)?;
        file.lock_exclusive()?;
        Ok(Self { file, path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = fs2::FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release file lock");
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
