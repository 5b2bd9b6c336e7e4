use serde::{Deserialize, Serialize};

/// What LONG arithmetic does when the exact result does not fit in an `i64`.
///
/// Decimal overflow is always an error; doubles follow IEEE-754.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Fail the whole event with `EvaluationError::Overflow`
    #[default]
    Error,
    /// Two's-complement wrap-around
    Wrap,
}

/// Evaluation settings shared by every event an [`Evaluator`](crate::Evaluator) applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Integer overflow handling
    pub overflow: OverflowPolicy,
}

impl EvalConfig {
    /// Default configuration (overflow is an error).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(overflow: OverflowPolicy) -> Self {
        Self { overflow }
    }

    /// Convenience: checked integer arithmetic.
    pub fn checked() -> Self {
        Self { overflow: OverflowPolicy::Error }
    }

    /// Convenience: wrapping integer arithmetic. Sums stay exactly invertible
    /// under wrap-around, so retraction still restores the prior buffer.
    pub fn wrapping() -> Self {
        Self { overflow: OverflowPolicy::Wrap }
    }
}
