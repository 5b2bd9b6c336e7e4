use std::fmt;

use crate::{expression::{ArithmeticOp, ComparatorOp, ExprSet, UnaryOp}, types::{DataType, Value}};

/// Rejected descriptor. Raised while building a descriptor, before any row is
/// processed; a descriptor that fails here is never constructed.
#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorError {
    EmptyName,
    DuplicateSlot(String),
    ExpressionSetLength { set: ExprSet, expected: usize, got: usize },
    MissingFinalize,
    UnknownSlot { set: ExprSet, name: String },
    OperandOutOfRange { set: ExprSet, index: usize, operand_count: usize },
    /// A reference kind the expression set may not see (e.g. an operand in `merge`).
    ForbiddenReference { set: ExprSet, reference: String },
    LiteralTypeMismatch { declared: DataType, value: Value },
    ArithmeticTypes { op: ArithmeticOp, left: DataType, right: DataType },
    ComparisonTypes { op: ComparatorOp, left: DataType, right: DataType },
    UnaryType { op: UnaryOp, got: DataType },
    ConditionNotBoolean(DataType),
    BranchTypes { then: DataType, otherwise: DataType },
    InvalidCast { from: DataType, to: DataType },
    /// Expression `slot` of `set` computes a different type than the slot declares.
    SlotTypeMismatch { set: ExprSet, slot: String, declared: DataType, got: DataType },
    ResultTypeMismatch { declared: DataType, got: DataType },
    /// `init` could not be folded to a value the slot accepts.
    InitValue { slot: String, reason: String },
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorError::EmptyName => write!(f, "descriptor name is empty"),
            DescriptorError::DuplicateSlot(name) => write!(f, "buffer slot `{}` declared twice", name),
            DescriptorError::ExpressionSetLength { set, expected, got } =>
                write!(f, "{} set has {} expressions, buffer has {} slots", set, got, expected),
            DescriptorError::MissingFinalize => write!(f, "finalize expression is missing"),
            DescriptorError::UnknownSlot { set, name } =>
                write!(f, "{}: unknown buffer slot `{}`", set, name),
            DescriptorError::OperandOutOfRange { set, index, operand_count } =>
                write!(f, "{}: operand ${} out of range (operand count {})", set, index, operand_count),
            DescriptorError::ForbiddenReference { set, reference } =>
                write!(f, "{}: reference `{}` is not allowed here", set, reference),
            DescriptorError::LiteralTypeMismatch { declared, value } =>
                write!(f, "literal {} does not have declared type {}", value, declared),
            DescriptorError::ArithmeticTypes { op, left, right } =>
                write!(f, "`{}` needs equal numeric operands, got {} and {}", op, left, right),
            DescriptorError::ComparisonTypes { op, left, right } =>
                write!(f, "`{}` needs operands of one type, got {} and {}", op, left, right),
            DescriptorError::UnaryType { op, got } => write!(f, "`{}` is not defined for {}", op, got),
            DescriptorError::ConditionNotBoolean(ty) => write!(f, "condition must be BOOLEAN, got {}", ty),
            DescriptorError::BranchTypes { then, otherwise } =>
                write!(f, "conditional branches differ: {} vs {}", then, otherwise),
            DescriptorError::InvalidCast { from, to } => write!(f, "cannot cast {} to {}", from, to),
            DescriptorError::SlotTypeMismatch { set, slot, declared, got } =>
                write!(f, "{}: slot `{}` is {} but its expression yields {}", set, slot, declared, got),
            DescriptorError::ResultTypeMismatch { declared, got } =>
                write!(f, "result type is {} but finalize yields {}", declared, got),
            DescriptorError::InitValue { slot, reason } =>
                write!(f, "init value of slot `{}`: {}", slot, reason),
        }
    }
}

impl std::error::Error for DescriptorError {}
