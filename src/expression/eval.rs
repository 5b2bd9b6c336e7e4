use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::{
    config::OverflowPolicy,
    error::EvaluationError,
    expression::{ArithmeticOp, BindContext, BinaryOp, BoundExpr, ExprSet, Expression, UnaryOp},
    types::{BufferLayout, DataType, Value},
};

/// Runtime bindings for one evaluation: the buffer being updated, the
/// partial buffer being merged in (merge only) and the row operands
/// (accumulate / retract only).
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub buffer: &'a [Value],
    pub merge: Option<&'a [Value]>,
    pub operands: &'a [Value],
    pub overflow: OverflowPolicy,
}

impl<'a> Frame<'a> {
    /// No bindings at all; enough for `init` expressions.
    pub fn empty(overflow: OverflowPolicy) -> Self {
        Self { buffer: &[], merge: None, operands: &[], overflow }
    }

    pub fn row(buffer: &'a [Value], operands: &'a [Value], overflow: OverflowPolicy) -> Self {
        Self { buffer, merge: None, operands, overflow }
    }

    pub fn merge(buffer: &'a [Value], other: &'a [Value], overflow: OverflowPolicy) -> Self {
        Self { buffer, merge: Some(other), operands: &[], overflow }
    }

    pub fn buffer_only(buffer: &'a [Value], overflow: OverflowPolicy) -> Self {
        Self { buffer, merge: None, operands: &[], overflow }
    }
}

/// Named bindings for evaluating a free-standing [`Expression`].
#[derive(Debug, Clone, Copy)]
pub struct Bindings<'a> {
    pub layout: &'a BufferLayout,
    pub operand_types: &'a [DataType],
    pub frame: Frame<'a>,
}

/// Bind `expr` against `bindings` and evaluate it.
///
/// Descriptors bind their expressions once at build time; this is for
/// one-off evaluation (tests, constant folding, debugging).
pub fn evaluate(expr: &Expression, bindings: &Bindings) -> Result<Value, EvaluationError> {
    let ctx = BindContext::new(bindings.layout, bindings.operand_types, ExprSet::Adhoc);
    let (bound, _) = expr.bind(&ctx)?;
    bound.evaluate(&bindings.frame)
}

impl BoundExpr {
    /// Evaluate against `frame`. Pure: never touches the frame's buffers.
    ///
    /// Nulls propagate through arithmetic, comparison, unary and cast nodes.
    /// `IsNull` never yields null, and a conditional whose condition is null
    /// takes the `otherwise` branch.
    pub fn evaluate(&self, frame: &Frame) -> Result<Value, EvaluationError> {
        match self {
            BoundExpr::Literal(v) => Ok(v.clone()),
            BoundExpr::Slot(i) => frame.buffer.get(*i).cloned()
                .ok_or_else(|| EvaluationError::UnboundReference(format!("slot #{}", i))),
            BoundExpr::MergeSlot(i) => frame.merge.and_then(|m| m.get(*i)).cloned()
                .ok_or_else(|| EvaluationError::UnboundReference(format!("merge slot #{}", i))),
            BoundExpr::Operand(i) => frame.operands.get(*i).cloned()
                .ok_or_else(|| EvaluationError::UnboundReference(format!("${}", i))),
            BoundExpr::Unary(op, inner) => apply_unary(*op, inner.evaluate(frame)?, frame.overflow),
            BoundExpr::Binary(op, lhs, rhs) => {
                let l = lhs.evaluate(frame)?;
                let r = rhs.evaluate(frame)?;
                match op {
                    BinaryOp::Arithmetic(a) => apply_arithmetic(*a, l, r, frame.overflow),
                    BinaryOp::Compare(c) => {
                        if l.is_null() || r.is_null() {
                            return Ok(Value::Null);
                        }
                        let ord = l.compare(&r).ok_or_else(|| type_mismatch(&l, r.clone()))?;
                        Ok(Value::Boolean(c.holds(ord)))
                    }
                }
            }
            BoundExpr::IsNull(inner) => Ok(Value::Boolean(inner.evaluate(frame)?.is_null())),
            BoundExpr::Conditional(cond, then, otherwise) => {
                match cond.evaluate(frame)? {
                    Value::Boolean(true) => then.evaluate(frame),
                    _ => otherwise.evaluate(frame),
                }
            }
            BoundExpr::Cast(inner, to) => cast_value(inner.evaluate(frame)?, *to),
        }
    }
}

fn type_mismatch(expected_like: &Value, got: Value) -> EvaluationError {
    match expected_like.data_type() {
        Some(expected) => EvaluationError::TypeMismatch { expected, got },
        None => EvaluationError::UnboundReference(format!("untyped value {}", got)),
    }
}

fn overflow(op: impl ToString, ty: DataType) -> EvaluationError {
    EvaluationError::Overflow { op: op.to_string(), ty }
}

fn apply_unary(op: UnaryOp, v: Value, policy: OverflowPolicy) -> Result<Value, EvaluationError> {
    match (op, v) {
        (_, Value::Null) => Ok(Value::Null),
        (UnaryOp::Negate, Value::Long(i)) => match policy {
            OverflowPolicy::Error => i.checked_neg().map(Value::Long).ok_or_else(|| overflow(op, DataType::Long)),
            OverflowPolicy::Wrap => Ok(Value::Long(i.wrapping_neg())),
        },
        (UnaryOp::Negate, Value::Double(f)) => Ok(Value::Double(-f)),
        (UnaryOp::Negate, Value::Decimal(d)) => Ok(Value::Decimal(-d)),
        (UnaryOp::Sqrt, Value::Double(f)) => {
            let x = f.into_inner();
            if x < 0.0 {
                return Err(EvaluationError::InvalidSqrt(x));
            }
            Ok(Value::double(x.sqrt()))
        }
        (UnaryOp::Sqrt, other) => Err(EvaluationError::TypeMismatch { expected: DataType::Double, got: other }),
        (UnaryOp::Negate, other) => Err(EvaluationError::TypeMismatch { expected: DataType::Long, got: other }),
    }
}

fn apply_arithmetic(op: ArithmeticOp, l: Value, r: Value, policy: OverflowPolicy) -> Result<Value, EvaluationError> {
    match (l, r) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Long(a), Value::Long(b)) => long_arithmetic(op, a, b, policy).map(Value::Long),
        (Value::Double(a), Value::Double(b)) => double_arithmetic(op, a.into_inner(), b.into_inner()).map(Value::double),
        (Value::Decimal(a), Value::Decimal(b)) => decimal_arithmetic(op, a, b).map(Value::Decimal),
        (l, r) => Err(type_mismatch(&l, r)),
    }
}

fn long_arithmetic(op: ArithmeticOp, a: i64, b: i64, policy: OverflowPolicy) -> Result<i64, EvaluationError> {
    if op == ArithmeticOp::Div && b == 0 {
        return Err(EvaluationError::DivideByZero);
    }
    match policy {
        OverflowPolicy::Error => {
            let out = match op {
                ArithmeticOp::Add => a.checked_add(b),
                ArithmeticOp::Sub => a.checked_sub(b),
                ArithmeticOp::Mul => a.checked_mul(b),
                ArithmeticOp::Div => a.checked_div(b),
            };
            out.ok_or_else(|| overflow(op, DataType::Long))
        }
        OverflowPolicy::Wrap => Ok(match op {
            ArithmeticOp::Add => a.wrapping_add(b),
            ArithmeticOp::Sub => a.wrapping_sub(b),
            ArithmeticOp::Mul => a.wrapping_mul(b),
            ArithmeticOp::Div => a.wrapping_div(b),
        }),
    }
}

fn double_arithmetic(op: ArithmeticOp, a: f64, b: f64) -> Result<f64, EvaluationError> {
    match op {
        ArithmeticOp::Add => Ok(a + b),
        ArithmeticOp::Sub => Ok(a - b),
        ArithmeticOp::Mul => Ok(a * b),
        ArithmeticOp::Div if b == 0.0 => Err(EvaluationError::DivideByZero),
        ArithmeticOp::Div => Ok(a / b),
    }
}

fn decimal_arithmetic(op: ArithmeticOp, a: Decimal, b: Decimal) -> Result<Decimal, EvaluationError> {
    let out = match op {
        ArithmeticOp::Add => a.checked_add(b),
        ArithmeticOp::Sub => a.checked_sub(b),
        ArithmeticOp::Mul => a.checked_mul(b),
        ArithmeticOp::Div if b.is_zero() => return Err(EvaluationError::DivideByZero),
        ArithmeticOp::Div => a.checked_div(b),
    };
    out.ok_or_else(|| overflow(op, DataType::Decimal))
}

fn cast_value(v: Value, to: DataType) -> Result<Value, EvaluationError> {
    if v.conforms_to(to) {
        return Ok(v);
    }
    let invalid = |value: &Value| EvaluationError::InvalidCast { value: value.clone(), to };
    match (&v, to) {
        (Value::Long(i), DataType::Double) => Ok(Value::double(*i as f64)),
        (Value::Long(i), DataType::Decimal) => Ok(Value::Decimal(Decimal::from(*i))),
        (Value::Double(f), DataType::Long) => {
            let x = f.into_inner().trunc();
            // i64::MAX is not representable as f64; the bound is exclusive
            if x.is_finite() && x >= i64::MIN as f64 && x < i64::MAX as f64 {
                Ok(Value::Long(x as i64))
            } else {
                Err(invalid(&v))
            }
        }
        (Value::Double(f), DataType::Decimal) => Decimal::from_f64_retain(f.into_inner())
            .map(Value::Decimal)
            .ok_or_else(|| invalid(&v)),
        (Value::Decimal(d), DataType::Double) => d.to_f64().map(Value::double).ok_or_else(|| invalid(&v)),
        (Value::Decimal(d), DataType::Long) => d.trunc().to_i64().map(Value::Long).ok_or_else(|| invalid(&v)),
        _ => Err(invalid(&v)),
    }
}
