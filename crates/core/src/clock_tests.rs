// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_epoch_is_nonzero() {
    let clock = SystemClock;
    assert!(clock.epoch_ms() > 0);
}

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new();
    let start_instant = clock.now();
    let start_ms = clock.epoch_ms();

    clock.advance(Duration::from_secs(5));

    assert_eq!(clock.now() - start_instant, Duration::from_secs(5));
    assert_eq!(clock.epoch_ms(), start_ms + 5_000);
}

#[test]
fn fake_clock_set_epoch_ms() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_700_000_000_000);
    assert_eq!(clock.epoch_ms(), 1_700_000_000_000);
}

#[test]
fn utc_derives_from_epoch_ms() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(0);
    assert_eq!(clock.utc().timestamp_millis(), 0);

    clock.set_epoch_ms(1_700_000_000_000);
    assert_eq!(clock.utc().timestamp_millis(), 1_700_000_000_000);
}

#[test]
fn clones_share_state() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.advance(Duration::from_millis(250));
    assert_eq!(other.epoch_ms(), clock.epoch_ms());
}
