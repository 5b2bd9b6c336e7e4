use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::DescriptorError,
    expression::{BinaryOp, Expression, UnaryOp},
    types::{BufferLayout, DataType, Value},
};

/// Which expression set an expression belongs to. Decides which references it may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExprSet {
    Init,
    Accumulate,
    Retract,
    Merge,
    Finalize,
    /// Free-standing evaluation: every reference kind is allowed.
    Adhoc,
}

impl ExprSet {
    pub fn allows_buffer(&self) -> bool {
        !matches!(self, ExprSet::Init)
    }

    pub fn allows_merge(&self) -> bool {
        matches!(self, ExprSet::Merge | ExprSet::Adhoc)
    }

    pub fn allows_operands(&self) -> bool {
        matches!(self, ExprSet::Accumulate | ExprSet::Retract | ExprSet::Adhoc)
    }
}

impl fmt::Display for ExprSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprSet::Init => write!(f, "init"),
            ExprSet::Accumulate => write!(f, "accumulate"),
            ExprSet::Retract => write!(f, "retract"),
            ExprSet::Merge => write!(f, "merge"),
            ExprSet::Finalize => write!(f, "finalize"),
            ExprSet::Adhoc => write!(f, "adhoc"),
        }
    }
}

/// What an expression may refer to while it is being bound.
#[derive(Debug, Clone, Copy)]
pub struct BindContext<'a> {
    pub layout: &'a BufferLayout,
    pub operand_types: &'a [DataType],
    pub set: ExprSet,
}

impl<'a> BindContext<'a> {
    pub fn new(layout: &'a BufferLayout, operand_types: &'a [DataType], set: ExprSet) -> Self {
        Self { layout, operand_types, set }
    }
}

/// Resolved form of an [`Expression`]: slot names replaced by positions,
/// types checked. Only produced by [`Expression::bind`].
#[derive(Debug, Clone, PartialEq)]
pub enum BoundExpr {
    Literal(Value),
    Slot(usize),
    MergeSlot(usize),
    Operand(usize),
    Unary(UnaryOp, Box<BoundExpr>),
    Binary(BinaryOp, Box<BoundExpr>, Box<BoundExpr>),
    IsNull(Box<BoundExpr>),
    Conditional(Box<BoundExpr>, Box<BoundExpr>, Box<BoundExpr>),
    Cast(Box<BoundExpr>, DataType),
}

impl Expression {
    /// Resolve references against `ctx` and infer the expression type.
    ///
    /// No implicit widening: arithmetic and comparison need both sides of the
    /// same type, conditional branches must agree, and conversions go through
    /// an explicit `Cast`.
    pub fn bind(&self, ctx: &BindContext) -> Result<(BoundExpr, DataType), DescriptorError> {
        let set = ctx.set;
        match self {
            Expression::Literal(value, ty) => {
                if !value.conforms_to(*ty) {
                    return Err(DescriptorError::LiteralTypeMismatch { declared: *ty, value: value.clone() });
                }
                Ok((BoundExpr::Literal(value.clone()), *ty))
            }
            Expression::BufferSlotRef(name) => {
                if !set.allows_buffer() {
                    return Err(DescriptorError::ForbiddenReference { set, reference: name.clone() });
                }
                let (idx, info) = ctx.layout.resolve(name)
                    .ok_or_else(|| DescriptorError::UnknownSlot { set, name: name.clone() })?;
                Ok((BoundExpr::Slot(idx), info.ty))
            }
            Expression::MergeSlotRef(name) => {
                if !set.allows_merge() {
                    return Err(DescriptorError::ForbiddenReference { set, reference: format!("merge.{}", name) });
                }
                let (idx, info) = ctx.layout.resolve(name)
                    .ok_or_else(|| DescriptorError::UnknownSlot { set, name: name.clone() })?;
                Ok((BoundExpr::MergeSlot(idx), info.ty))
            }
            Expression::OperandRef(index) => {
                if !set.allows_operands() {
                    return Err(DescriptorError::ForbiddenReference { set, reference: format!("${}", index) });
                }
                let ty = ctx.operand_types.get(*index).copied().ok_or(DescriptorError::OperandOutOfRange {
                    set,
                    index: *index,
                    operand_count: ctx.operand_types.len(),
                })?;
                Ok((BoundExpr::Operand(*index), ty))
            }
            Expression::Unary(op, inner) => {
                let (bound, ty) = inner.bind(ctx)?;
                let ok = match op {
                    UnaryOp::Negate => ty.is_numeric(),
                    UnaryOp::Sqrt => ty == DataType::Double,
                };
                if !ok {
                    return Err(DescriptorError::UnaryType { op: *op, got: ty });
                }
                Ok((BoundExpr::Unary(*op, Box::new(bound)), ty))
            }
            Expression::Binary(op, lhs, rhs) => {
                let (l, lt) = lhs.bind(ctx)?;
                let (r, rt) = rhs.bind(ctx)?;
                let ty = match op {
                    BinaryOp::Arithmetic(a) => {
                        if lt != rt || !lt.is_numeric() {
                            return Err(DescriptorError::ArithmeticTypes { op: *a, left: lt, right: rt });
                        }
                        lt
                    }
                    BinaryOp::Compare(c) => {
                        if lt != rt {
                            return Err(DescriptorError::ComparisonTypes { op: *c, left: lt, right: rt });
                        }
                        DataType::Boolean
                    }
                };
                Ok((BoundExpr::Binary(*op, Box::new(l), Box::new(r)), ty))
            }
            Expression::IsNull(inner) => {
                let (bound, _) = inner.bind(ctx)?;
                Ok((BoundExpr::IsNull(Box::new(bound)), DataType::Boolean))
            }
            Expression::Conditional(cond, then, otherwise) => {
                let (c, ct) = cond.bind(ctx)?;
                if ct != DataType::Boolean {
                    return Err(DescriptorError::ConditionNotBoolean(ct));
                }
                let (t, tt) = then.bind(ctx)?;
                let (o, ot) = otherwise.bind(ctx)?;
                if tt != ot {
                    return Err(DescriptorError::BranchTypes { then: tt, otherwise: ot });
                }
                Ok((BoundExpr::Conditional(Box::new(c), Box::new(t), Box::new(o)), tt))
            }
            Expression::Cast(inner, to) => {
                let (bound, from) = inner.bind(ctx)?;
                if !from.can_cast_to(*to) {
                    return Err(DescriptorError::InvalidCast { from, to: *to });
                }
                Ok((BoundExpr::Cast(Box::new(bound), *to), *to))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::*;
    use crate::types::SlotInfo;

    fn layout() -> BufferLayout {
        let mut l = BufferLayout::new();
        l.push("sum", SlotInfo::non_null(DataType::Long));
        l.push("count", SlotInfo::non_null(DataType::Long));
        l
    }

    #[test]
    fn resolves_slots_by_position() {
        let l = layout();
        let ctx = BindContext::new(&l, &[DataType::Long], ExprSet::Accumulate);
        let (bound, ty) = plus(slot("count"), operand(0)).bind(&ctx).unwrap();
        assert_eq!(ty, DataType::Long);
        assert_eq!(
            bound,
            BoundExpr::Binary(
                BinaryOp::Arithmetic(ArithmeticOp::Add),
                Box::new(BoundExpr::Slot(1)),
                Box::new(BoundExpr::Operand(0))
            )
        );
    }

    #[test]
    fn rejects_references_outside_their_set() {
        let l = layout();
        let init = BindContext::new(&l, &[DataType::Long], ExprSet::Init);
        assert!(matches!(slot("sum").bind(&init), Err(DescriptorError::ForbiddenReference { set: ExprSet::Init, .. })));
        assert!(lit_long(0).bind(&init).is_ok());

        let merge = BindContext::new(&l, &[DataType::Long], ExprSet::Merge);
        assert!(matches!(operand(0).bind(&merge), Err(DescriptorError::ForbiddenReference { .. })));
        assert!(merge_slot("sum").bind(&merge).is_ok());

        let acc = BindContext::new(&l, &[DataType::Long], ExprSet::Accumulate);
        assert!(matches!(merge_slot("sum").bind(&acc), Err(DescriptorError::ForbiddenReference { .. })));

        let fin = BindContext::new(&l, &[DataType::Long], ExprSet::Finalize);
        assert!(matches!(operand(0).bind(&fin), Err(DescriptorError::ForbiddenReference { .. })));
    }

    #[test]
    fn rejects_unknown_slot_and_operand_out_of_range() {
        let l = layout();
        let ctx = BindContext::new(&l, &[DataType::Long], ExprSet::Retract);
        assert_eq!(
            slot("avg").bind(&ctx).unwrap_err(),
            DescriptorError::UnknownSlot { set: ExprSet::Retract, name: "avg".into() }
        );
        assert_eq!(
            operand(1).bind(&ctx).unwrap_err(),
            DescriptorError::OperandOutOfRange { set: ExprSet::Retract, index: 1, operand_count: 1 }
        );
    }

    #[test]
    fn no_implicit_widening() {
        let l = layout();
        let ctx = BindContext::new(&l, &[DataType::Double], ExprSet::Accumulate);
        assert!(matches!(
            plus(slot("sum"), operand(0)).bind(&ctx),
            Err(DescriptorError::ArithmeticTypes { left: DataType::Long, right: DataType::Double, .. })
        ));
        assert!(matches!(
            lt(slot("sum"), lit_double(1.0)).bind(&ctx),
            Err(DescriptorError::ComparisonTypes { .. })
        ));
        let (_, ty) = plus(cast(slot("sum"), DataType::Double), operand(0)).bind(&ctx).unwrap();
        assert_eq!(ty, DataType::Double);
    }

    #[test]
    fn literal_must_match_declared_type() {
        let l = layout();
        let ctx = BindContext::new(&l, &[], ExprSet::Init);
        let bad = Expression::Literal(Value::double(1.0), DataType::Long);
        assert!(matches!(bad.bind(&ctx), Err(DescriptorError::LiteralTypeMismatch { declared: DataType::Long, .. })));
        assert_eq!(null_of(DataType::Decimal).bind(&ctx).unwrap().1, DataType::Decimal);
    }

    #[test]
    fn conditional_and_unary_typing() {
        let l = layout();
        let ctx = BindContext::new(&l, &[DataType::Long], ExprSet::Accumulate);
        assert!(matches!(
            if_then_else(slot("sum"), lit_long(0), lit_long(1)).bind(&ctx),
            Err(DescriptorError::ConditionNotBoolean(DataType::Long))
        ));
        assert!(matches!(
            if_then_else(is_null(operand(0)), lit_long(0), lit_double(1.0)).bind(&ctx),
            Err(DescriptorError::BranchTypes { .. })
        ));
        assert!(matches!(sqrt(slot("sum")).bind(&ctx), Err(DescriptorError::UnaryType { op: UnaryOp::Sqrt, .. })));
        assert!(matches!(negate(lit_bool(true)).bind(&ctx), Err(DescriptorError::UnaryType { .. })));
        assert!(matches!(
            cast(lit_bool(true), DataType::Long).bind(&ctx),
            Err(DescriptorError::InvalidCast { from: DataType::Boolean, to: DataType::Long })
        ));
        assert_eq!(is_null(operand(0)).bind(&ctx).unwrap().1, DataType::Boolean);
    }
}
