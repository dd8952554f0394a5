//! Token usage tracking.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

/// Token usage statistics from a model call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Number of tokens in the prompt.
    #[serde(default)]
    pub input_tokens: u32,

    /// Number of tokens in the output.
    #[serde(default)]
    pub output_tokens: u32,

    /// Total tokens used.
    #[serde(default)]
    pub total_tokens: u32,
}

impl Usage {
    /// Create a new usage record.
    #[must_use]
    pub const fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }

    /// Create an empty usage record.
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    /// Create usage with an explicit total, as reported by the provider.
    #[must_use]
    pub fn with_total(input_tokens: u32, output_tokens: u32, total_tokens: Option<u32>) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: total_tokens.unwrap_or(input_tokens + output_tokens),
        }
    }

    /// Check if usage is empty (no tokens used).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_tokens == 0
    }
}

impl Add for Usage {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            input_tokens: self.input_tokens.saturating_add(rhs.input_tokens),
            output_tokens: self.output_tokens.saturating_add(rhs.output_tokens),
            total_tokens: self.total_tokens.saturating_add(rhs.total_tokens),
        }
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Usage {{ input: {}, output: {}, total: {} }}",
            self.input_tokens, self.output_tokens, self.total_tokens
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_computes_total() {
        let usage = Usage::new(100, 50);
        assert_eq!(usage.total_tokens, 150);
        assert!(!usage.is_empty());
        assert!(Usage::zero().is_empty());
    }

    #[test]
    fn with_total_prefers_reported_value() {
        assert_eq!(Usage::with_total(10, 5, Some(20)).total_tokens, 20);
        assert_eq!(Usage::with_total(10, 5, None).total_tokens, 15);
    }

    #[test]
    fn add_assign_accumulates() {
        let mut usage = Usage::new(10, 5);
        usage += Usage::new(20, 10);
        assert_eq!(usage, Usage::new(30, 15));
    }

    #[test]
    fn display() {
        assert_eq!(
            Usage::new(1, 2).to_string(),
            "Usage { input: 1, output: 2, total: 3 }"
        );
    }
}
