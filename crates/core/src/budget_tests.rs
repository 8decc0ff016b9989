// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn spec(max_tokens: u64, max_cost: f64) -> BudgetSpec {
    BudgetSpec { max_tokens, max_cost_usd: max_cost, ..BudgetSpec::default() }
}

#[test]
fn reported_usage_accumulates() {
    let mut counter = BudgetCounter::new(spec(1000, 0.0));
    counter.add_usage(Some(100), Some(0.02), 0);
    counter.add_usage(Some(250), None, 0);
    assert_eq!(counter.tokens_used, 350);
    assert!((counter.cost_used_usd - 0.02).abs() < f64::EPSILON);
}

#[test]
fn missing_tokens_estimated_from_chars() {
    let mut counter = BudgetCounter::new(spec(1000, 0.0));
    // 4 chars per token, 10 chars -> ceil(2.5) = 3 tokens
    counter.add_usage(None, None, 10);
    assert_eq!(counter.tokens_used, 3);
}

#[test]
fn zero_caps_never_exceed() {
    let mut counter = BudgetCounter::new(spec(0, 0.0));
    counter.add_usage(Some(1_000_000), Some(100.0), 0);
    assert!(!counter.hard_exceeded());
    assert!(!counter.soft_exceeded());
}

#[test]
fn token_cap_trips_hard() {
    let mut counter = BudgetCounter::new(spec(100, 0.0));
    counter.add_usage(Some(60), None, 0);
    assert!(!counter.hard_exceeded());
    counter.add_usage(Some(40), None, 0);
    assert!(counter.hard_exceeded());
}

#[test]
fn cost_cap_trips_hard() {
    let mut counter = BudgetCounter::new(spec(0, 1.0));
    counter.add_usage(None, Some(1.5), 0);
    assert!(counter.hard_exceeded());
}

#[test]
fn reserve_trips_soft_before_hard() {
    let mut counter = BudgetCounter::new(BudgetSpec {
        max_tokens: 100,
        reserve_ratio: 0.2,
        ..BudgetSpec::default()
    });
    counter.add_usage(Some(80), None, 0);
    assert!(counter.soft_exceeded());
    assert!(!counter.hard_exceeded());
}

#[test]
fn snapshot_reflects_state() {
    let mut counter = BudgetCounter::new(spec(100, 0.0));
    counter.add_usage(Some(100), None, 0);
    let snap = counter.snapshot();
    assert_eq!(snap.tokens_used, 100);
    assert!(snap.hard_exceeded);
    assert!(snap.soft_exceeded);
}
