// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde::{Deserialize, Serialize};
use tempfile::tempdir;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Doc {
    name: String,
    value: u64,
}

#[test]
fn write_then_read_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.json");
    let doc = Doc { name: "x".into(), value: 42 };

    write_json_atomic(&path, &doc).unwrap();
    let back: Doc = read_json_or(&path, Doc { name: String::new(), value: 0 }).unwrap();
    assert_eq!(back, doc);
}

#[test]
fn write_replaces_existing_document() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.json");

    write_json_atomic(&path, &Doc { name: "a".into(), value: 1 }).unwrap();
    write_json_atomic(&path, &Doc { name: "b".into(), value: 2 }).unwrap();

    let back: Option<Doc> = read_json_opt(&path).unwrap();
    assert_eq!(back, Some(Doc { name: "b".into(), value: 2 }));
}

#[test]
fn no_temp_file_left_behind() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.json");
    write_json_atomic(&path, &Doc { name: "a".into(), value: 1 }).unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["doc.json".to_string()]);
}

#[test]
fn missing_file_yields_default() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let doc = read_json_or(&path, Doc { name: "default".into(), value: 0 }).unwrap();
    assert_eq!(doc.name, "default");

    let opt: Option<Doc> = read_json_opt(&path).unwrap();
    assert!(opt.is_none());
}

#[test]
fn malformed_document_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{not json").unwrap();

    let err = read_json_or(&path, Doc { name: String::new(), value: 0 });
    assert!(matches!(err, Err(BusError::Json(_))));
}
