// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn generated_run_id_format() {
    let id = RunId::generate();
    let suffix = id.as_str().strip_prefix("run_").unwrap();
    assert_eq!(suffix.len(), 12);
    assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn generated_run_ids_are_unique() {
    assert_ne!(RunId::generate(), RunId::generate());
}

#[test]
fn run_id_serde_is_transparent() {
    let id = RunId::new("run_abc123def456");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"run_abc123def456\"");
    let parsed: RunId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn run_id_str_comparisons() {
    let id = RunId::new("run_000000000000");
    assert_eq!(id, "run_000000000000");
    assert_eq!(id.as_str(), "run_000000000000");
}
