//! Shorthand constructors for [`Expression`] trees.

use rust_decimal::Decimal;

use crate::{expression::{ArithmeticOp, BinaryOp, ComparatorOp, Expression, UnaryOp}, types::{DataType, Value}};

pub fn lit_long(i: i64) -> Expression { Expression::Literal(Value::Long(i), DataType::Long) }
pub fn lit_double(f: f64) -> Expression { Expression::Literal(Value::double(f), DataType::Double) }
pub fn lit_decimal(d: Decimal) -> Expression { Expression::Literal(Value::Decimal(d), DataType::Decimal) }
pub fn lit_bool(b: bool) -> Expression { Expression::Literal(Value::Boolean(b), DataType::Boolean) }
pub fn null_of(ty: DataType) -> Expression { Expression::Literal(Value::Null, ty) }

/// Additive identity of `ty` as a literal; `None` for BOOLEAN.
pub fn zero_of(ty: DataType) -> Option<Expression> {
    Value::zero_of(ty).map(|v| Expression::Literal(v, ty))
}

pub fn slot(name: &str) -> Expression { Expression::BufferSlotRef(name.to_string()) }
pub fn merge_slot(name: &str) -> Expression { Expression::MergeSlotRef(name.to_string()) }
pub fn operand(index: usize) -> Expression { Expression::OperandRef(index) }

fn arith(op: ArithmeticOp, l: Expression, r: Expression) -> Expression {
    Expression::Binary(BinaryOp::Arithmetic(op), Box::new(l), Box::new(r))
}

fn compare(op: ComparatorOp, l: Expression, r: Expression) -> Expression {
    Expression::Binary(BinaryOp::Compare(op), Box::new(l), Box::new(r))
}

pub fn plus(l: Expression, r: Expression) -> Expression { arith(ArithmeticOp::Add, l, r) }
pub fn minus(l: Expression, r: Expression) -> Expression { arith(ArithmeticOp::Sub, l, r) }
pub fn times(l: Expression, r: Expression) -> Expression { arith(ArithmeticOp::Mul, l, r) }
pub fn divide(l: Expression, r: Expression) -> Expression { arith(ArithmeticOp::Div, l, r) }

pub fn eq(l: Expression, r: Expression) -> Expression { compare(ComparatorOp::Eq, l, r) }
pub fn not_eq(l: Expression, r: Expression) -> Expression { compare(ComparatorOp::NotEq, l, r) }
pub fn lt(l: Expression, r: Expression) -> Expression { compare(ComparatorOp::Lt, l, r) }
pub fn lt_eq(l: Expression, r: Expression) -> Expression { compare(ComparatorOp::LtEq, l, r) }
pub fn gt(l: Expression, r: Expression) -> Expression { compare(ComparatorOp::Gt, l, r) }
pub fn gt_eq(l: Expression, r: Expression) -> Expression { compare(ComparatorOp::GtEq, l, r) }

pub fn negate(e: Expression) -> Expression { Expression::Unary(UnaryOp::Negate, Box::new(e)) }
pub fn sqrt(e: Expression) -> Expression { Expression::Unary(UnaryOp::Sqrt, Box::new(e)) }

pub fn is_null(e: Expression) -> Expression { Expression::IsNull(Box::new(e)) }

pub fn if_then_else(cond: Expression, then: Expression, otherwise: Expression) -> Expression {
    Expression::Conditional(Box::new(cond), Box::new(then), Box::new(otherwise))
}

pub fn cast(e: Expression, to: DataType) -> Expression { Expression::Cast(Box::new(e), to) }
