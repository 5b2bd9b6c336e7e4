use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{expression::{BinaryOp, UnaryOp}, types::{DataType, Value}};

/// Immutable expression tree describing how one buffer slot (or the final
/// result) is computed.
///
/// References are by name (buffer slots) or position (operands); they are
/// resolved and type-checked once, when a descriptor is built.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expression {
    /// Typed literal. `Value::Null` is a null of the given type.
    Literal(Value, DataType),
    /// Slot of the buffer being updated.
    BufferSlotRef(String),
    /// Same slot of the partial buffer being merged in.
    MergeSlotRef(String),
    /// Input column of the row being accumulated or retracted.
    OperandRef(usize),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    IsNull(Box<Expression>),
    /// `Conditional(cond, then, otherwise)`; a null condition selects `otherwise`.
    Conditional(Box<Expression>, Box<Expression>, Box<Expression>),
    /// Explicit numeric conversion.
    Cast(Box<Expression>, DataType),
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(Value::Null, ty) => write!(f, "null:{}", ty),
            Expression::Literal(v, _) => write!(f, "{}", v),
            Expression::BufferSlotRef(name) => write!(f, "{}", name),
            Expression::MergeSlotRef(name) => write!(f, "merge.{}", name),
            Expression::OperandRef(i) => write!(f, "${}", i),
            Expression::Unary(UnaryOp::Negate, e) => write!(f, "-({})", e),
            Expression::Unary(UnaryOp::Sqrt, e) => write!(f, "sqrt({})", e),
            Expression::Binary(op, l, r) => write!(f, "({} {} {})", l, op, r),
            Expression::IsNull(e) => write!(f, "is_null({})", e),
            Expression::Conditional(c, t, o) => write!(f, "if({}, {}, {})", c, t, o),
            Expression::Cast(e, ty) => write!(f, "cast({} as {})", e, ty),
        }
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expression({})", self)
    }
}
