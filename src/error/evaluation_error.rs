use std::fmt;

use crate::{error::DescriptorError, types::{DataType, Value}};

/// Failure while applying an expression set to a buffer.
///
/// Built-in descriptors guard every partial operation, so for them this only
/// surfaces for caller mistakes (wrong operand arity or types, uninitialized
/// buffers), integer overflow under the default policy, or a retraction an
/// extrema-only descriptor refuses.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationError {
    Overflow { op: String, ty: DataType },
    DivideByZero,
    InvalidSqrt(f64),
    InvalidCast { value: Value, to: DataType },
    TypeMismatch { expected: DataType, got: Value },
    NullInNonNullableSlot(String),
    NullResult(String),
    /// The descriptor's retract guard held: the buffer cannot undo this row.
    InexactRetraction { aggregate: String, row: Vec<Value> },
    OperandCount { expected: usize, got: usize },
    UninitializedBuffer,
    BufferShape { expected: usize, got: usize },
    UnboundReference(String),
    InvalidExpression(DescriptorError),
    Json { expected: DataType, got: String },
}

impl fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationError::Overflow { op, ty } => write!(f, "{} overflow in `{}`", ty, op),
            EvaluationError::DivideByZero => write!(f, "division by zero"),
            EvaluationError::InvalidSqrt(x) => write!(f, "square root of negative value {}", x),
            EvaluationError::InvalidCast { value, to } => write!(f, "cannot cast {} to {}", value, to),
            EvaluationError::TypeMismatch { expected, got } => write!(f, "expected {}, got {}", expected, got),
            EvaluationError::NullInNonNullableSlot(slot) => write!(f, "null written to non-nullable slot `{}`", slot),
            EvaluationError::NullResult(name) => write!(f, "`{}` finalized to null but its result is not nullable", name),
            EvaluationError::InexactRetraction { aggregate, row } => {
                let row = row.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
                write!(f, "`{}` cannot retract ({}) exactly; recompute the group", aggregate, row)
            }
            EvaluationError::OperandCount { expected, got } => write!(f, "expected {} operands, got {}", expected, got),
            EvaluationError::UninitializedBuffer => write!(f, "buffer is not initialized"),
            EvaluationError::BufferShape { expected, got } => write!(f, "buffer has {} slots, layout has {}", got, expected),
            EvaluationError::UnboundReference(r) => write!(f, "reference `{}` has no binding", r),
            EvaluationError::InvalidExpression(e) => write!(f, "invalid expression: {}", e),
            EvaluationError::Json { expected, got } => write!(f, "cannot read {} as {}", got, expected),
        }
    }
}

impl std::error::Error for EvaluationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvaluationError::InvalidExpression(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DescriptorError> for EvaluationError {
    fn from(e: DescriptorError) -> Self {
        EvaluationError::InvalidExpression(e)
    }
}
