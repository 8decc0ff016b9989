// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token usage extraction from backend output lines.
//!
//! Backends that stream JSON (codex `--json`, claude `--output-format json`)
//! embed usage blocks in their event lines. Progress events are tagged with
//! whatever usage they carry; lines without usage fall back to the budget's
//! chars-per-token estimate downstream.

use serde_json::Value;

/// Usage parsed from one output line.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageSample {
    pub tokens: Option<u64>,
    pub cost_usd: Option<f64>,
}

fn as_u64(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| value.as_f64().map(|f| f.max(0.0) as u64))
}

/// Extract token usage and cost from a line, if it is a JSON event carrying
/// them. Recognizes the common shapes:
/// `{"usage": {"input_tokens": N, "output_tokens": N, ...}}`,
/// `{"total_tokens": N}`, and `{"total_cost_usd": X}` / `{"cost_usd": X}`.
pub fn parse_usage(line: &str) -> UsageSample {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return UsageSample::default();
    }
    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return UsageSample::default();
    };

    let mut tokens = None;
    if let Some(usage) = value.get("usage") {
        let mut sum = 0u64;
        let mut any = false;
        for key in [
            "input_tokens",
            "output_tokens",
            "cache_creation_input_tokens",
            "cache_read_input_tokens",
        ] {
            if let Some(n) = usage.get(key).and_then(as_u64) {
                sum += n;
                any = true;
            }
        }
        if !any {
            if let Some(n) = usage.get("total_tokens").and_then(as_u64) {
                sum = n;
                any = true;
            }
        }
        if any {
            tokens = Some(sum);
        }
    }
    if tokens.is_none() {
        tokens = value.get("total_tokens").and_then(as_u64);
    }

    let cost_usd = value
        .get("total_cost_usd")
        .or_else(|| value.get("cost_usd"))
        .and_then(Value::as_f64);

    UsageSample { tokens, cost_usd }
}

#[cfg(test)]
#[path = "usage_tests.rs"]
mod tests;
