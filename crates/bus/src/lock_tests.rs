// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fs2::FileExt;
use tempfile::tempdir;

#[test]
fn acquire_creates_lock_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("box.lock");

    let lock = FileLock::acquire(&path).unwrap();
    assert!(path.exists());
    assert_eq!(lock.path(), path);
}

#[test]
fn lock_is_exclusive_while_held() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("box.lock");

    let _held = FileLock::acquire(&path).unwrap();

    // A second handle cannot take the lock while the guard lives.
    let probe = std::fs::OpenOptions::new().read(true).write(true).open(&path).unwrap();
    assert!(probe.try_lock_exclusive().is_err());
}

#[test]
fn drop_releases_lock() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("box.lock");

    {
        let _held = FileLock::acquire(&path).unwrap();
    }

    let probe = std::fs::OpenOptions::new().read(true).write(true).open(&path).unwrap();
    assert!(probe.try_lock_exclusive().is_ok());
    probe.unlock().unwrap();
}

#[test]
fn reacquire_after_release() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("box.lock");

    drop(FileLock::acquire(&path).unwrap());
    drop(FileLock::acquire(&path).unwrap());
}
