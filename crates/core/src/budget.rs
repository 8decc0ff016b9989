// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Budget caps and accumulators.
//!
//! The coordinator tracks token and cost usage across all agents. When a
//! worker event carries no usage data, tokens are estimated from the text
//! length with a chars-per-token fallback so silent backends still count
//! against the cap. A hard-exceeded budget moves the run into the failing
//! phase; the reserve ratio marks the soft threshold before that.

use serde::{Deserialize, Serialize};

fn default_chars_per_token() -> f64 {
    4.0
}

fn default_reserve_ratio() -> f64 {
    0.15
}

/// Configured budget limits. Zero caps mean unlimited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSpec {
    #[serde(default)]
    pub max_tokens: u64,
    #[serde(default)]
    pub max_cost_usd: f64,
    /// Fraction of the cap held back as a soft warning threshold.
    #[serde(default = "default_reserve_ratio")]
    pub reserve_ratio: f64,
    /// Token estimate divisor for events without usage data.
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token_fallback: f64,
}

impl Default for BudgetSpec {
    fn default() -> Self {
        Self {
            max_tokens: 0,
            max_cost_usd: 0.0,
            reserve_ratio: default_reserve_ratio(),
            chars_per_token_fallback: default_chars_per_token(),
        }
    }
}

/// Accumulated usage against a [`BudgetSpec`].
#[derive(Debug, Clone)]
pub struct BudgetCounter {
    spec: BudgetSpec,
    pub tokens_used: u64,
    pub cost_used_usd: f64,
}

impl BudgetCounter {
    pub fn new(spec: BudgetSpec) -> Self {
        Self { spec, tokens_used: 0, cost_used_usd: 0.0 }
    }

    pub fn spec(&self) -> &BudgetSpec {
        &self.spec
    }

    /// Record usage from one worker event. Missing token counts are estimated
    /// from `text_chars` via the chars-per-token fallback; missing cost adds
    /// nothing (cost is only ever reported, never estimated).
    pub fn add_usage(&mut self, tokens: Option<u64>, cost_usd: Option<f64>, text_chars: usize) {
        match tokens {
            Some(t) => self.tokens_used += t,
            None => {
                let divisor = self.spec.chars_per_token_fallback.max(1.0);
                self.tokens_used += (text_chars as f64 / divisor).ceil() as u64;
            }
        }
        if let Some(c) = cost_usd {
            self.cost_used_usd += c;
        }
    }

    /// Hard cap hit: the run must stop dispatching and terminate.
    pub fn hard_exceeded(&self) -> bool {
        (self.spec.max_tokens > 0 && self.tokens_used >= self.spec.max_tokens)
            || (self.spec.max_cost_usd > 0.0 && self.cost_used_usd >= self.spec.max_cost_usd)
    }

    /// Soft threshold: usage has eaten into the configured reserve.
    pub fn soft_exceeded(&self) -> bool {
        let ratio = 1.0 - self.spec.reserve_ratio.clamp(0.0, 1.0);
        (self.spec.max_tokens > 0
            && self.tokens_used as f64 >= self.spec.max_tokens as f64 * ratio)
            || (self.spec.max_cost_usd > 0.0
                && self.cost_used_usd >= self.spec.max_cost_usd * ratio)
    }

    /// Projection for the state snapshot.
    pub fn snapshot(&self) -> BudgetSnapshot {
        BudgetSnapshot {
            tokens_used: self.tokens_used,
            cost_used_usd: self.cost_used_usd,
            max_tokens: self.spec.max_tokens,
            max_cost_usd: self.spec.max_cost_usd,
            reserve_ratio: self.spec.reserve_ratio,
            soft_exceeded: self.soft_exceeded(),
            hard_exceeded: self.hard_exceeded(),
        }
    }
}

/// Serialized budget state in `state.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    pub tokens_used: u64,
    pub cost_used_usd: f64,
    pub max_tokens: u64,
    pub max_cost_usd: f64,
    pub reserve_ratio: f64,
    pub soft_exceeded: bool,
    pub hard_exceeded: bool,
}

#[cfg(test)]
#[path = "budget_tests.rs"]
mod tests;
