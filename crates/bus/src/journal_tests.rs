// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fm_core::AgentId;
use std::io::Write as _;
use tempfile::tempdir;

fn ts(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap()
}

fn run_id() -> RunId {
    RunId::new("run_0123456789ab")
}

#[test]
fn append_then_read_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.jsonl");

    let mut journal = EventJournal::open(&path, run_id()).unwrap();
    journal.append(ts(1), Event::AgentRestart { agent_id: AgentId::new("w-1") }).unwrap();
    journal
        .append(
            ts(2),
            Event::Error {
                category: "timeout".into(),
                message: "max runtime exceeded".into(),
                severity: "error".into(),
            },
        )
        .unwrap();

    let events = read_journal(&path).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event.name(), "agent.restart");
    assert_eq!(events[1].timestamp, ts(2));
    assert_eq!(events[1].run_id, run_id());
}

#[test]
fn reopen_appends_rather_than_truncates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.jsonl");

    {
        let mut journal = EventJournal::open(&path, run_id()).unwrap();
        journal.append(ts(1), Event::AgentRestart { agent_id: AgentId::new("w-1") }).unwrap();
    }
    {
        let mut journal = EventJournal::open(&path, run_id()).unwrap();
        journal.append(ts(2), Event::AgentRestart { agent_id: AgentId::new("w-2") }).unwrap();
    }

    let events = read_journal(&path).unwrap();
    assert_eq!(events.len(), 2);
}

#[test]
fn truncated_trailing_line_is_tolerated() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.jsonl");

    let mut journal = EventJournal::open(&path, run_id()).unwrap();
    journal.append(ts(1), Event::AgentRestart { agent_id: AgentId::new("w-1") }).unwrap();
    drop(journal);

    // Simulate a crash mid-write.
    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(b"{\"timestamp\":\"2026-01-").unwrap();

    let events = read_journal(&path).unwrap();
    assert_eq!(events.len(), 1);
}

#[test]
fn missing_journal_reads_empty() {
    let dir = tempdir().unwrap();
    let events = read_journal(&dir.path().join("absent.jsonl")).unwrap();
    assert!(events.is_empty());
}

#[test]
fn unknown_event_types_survive_as_custom() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    std::fs::write(
        &path,
        "{\"timestamp\":\"2026-01-01T00:00:00Z\",\"run_id\":\"run_x\",\"type\":\"future.thing\",\"payload\":{}}\n",
    )
    .unwrap();

    let events = read_journal(&path).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, Event::Custom);
}
