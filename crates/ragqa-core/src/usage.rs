//! Per-call token and cost accounting.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Monetary cost of a single provider call, in US dollars.
///
/// Renders with eight decimal places and a trailing dollar sign
/// (`0.00001240$`), which is also its serialized form.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Cost(f64);

impl Cost {
    /// A zero cost.
    pub const ZERO: Self = Self(0.0);

    /// Creates a cost from a dollar amount.
    pub fn new(dollars: f64) -> Self {
        Self(dollars)
    }

    /// Computes the cost of `tokens` at `price_per_million` dollars.
    pub fn per_million(tokens: u64, price_per_million: f64) -> Self {
        Self(tokens as f64 * (price_per_million / 1_000_000.0))
    }

    /// Returns the amount in dollars.
    pub fn dollars(self) -> f64 {
        self.0
    }
}

impl std::ops::Add for Cost {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}$", self.0)
    }
}

impl From<Cost> for String {
    fn from(cost: Cost) -> Self {
        cost.to_string()
    }
}

impl TryFrom<String> for Cost {
    type Error = std::num::ParseFloatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.trim().trim_end_matches('$').parse().map(Self)
    }
}

/// By-value accounting snapshot attached to a single embedding or generation call.
///
/// Records are never aggregated by the producing component; summing them
/// across calls is the caller's concern.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Tokens consumed by the input.
    pub prompt_tokens: u64,
    /// Tokens consumed in total (input and output).
    pub total_tokens: u64,
    /// Cost of the call.
    pub cost: Cost,
}

impl UsageRecord {
    /// Creates a new usage record.
    pub fn new(prompt_tokens: u64, total_tokens: u64, cost: Cost) -> Self {
        Self {
            prompt_tokens,
            total_tokens,
            cost,
        }
    }

    /// Returns the sum of two records.
    pub fn combine(&self, other: &Self) -> Self {
        Self {
            prompt_tokens: self.prompt_tokens + other.prompt_tokens,
            total_tokens: self.total_tokens + other.total_tokens,
            cost: self.cost + other.cost,
        }
    }
}
