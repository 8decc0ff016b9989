// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn anthropic_style_usage_block() {
    let line = r#"{"type":"result","usage":{"input_tokens":100,"output_tokens":25},"total_cost_usd":0.0125}"#;
    let sample = parse_usage(line);
    assert_eq!(sample.tokens, Some(125));
    assert_eq!(sample.cost_usd, Some(0.0125));
}

#[test]
fn cache_tokens_are_counted() {
    let line = r#"{"usage":{"input_tokens":10,"output_tokens":5,"cache_read_input_tokens":85}}"#;
    assert_eq!(parse_usage(line).tokens, Some(100));
}

#[test]
fn usage_total_tokens_fallback() {
    let line = r#"{"usage":{"total_tokens":42}}"#;
    assert_eq!(parse_usage(line).tokens, Some(42));
}

#[test]
fn top_level_total_tokens() {
    let line = r#"{"total_tokens":7,"cost_usd":0.001}"#;
    let sample = parse_usage(line);
    assert_eq!(sample.tokens, Some(7));
    assert_eq!(sample.cost_usd, Some(0.001));
}

#[parameterized(
    plain_text = { "compiling foo v0.1.0" },
    non_usage_json = { r#"{"type":"message","text":"hello"}"# },
    malformed_json = { "{\"usage\": " },
    empty = { "" },
)]
fn lines_without_usage_yield_nothing(line: &str) {
    assert_eq!(parse_usage(line), UsageSample::default());
}
