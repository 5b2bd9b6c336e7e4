pub mod count_impl;
pub use count_impl::*;

pub mod sum_impl;
pub use sum_impl::*;

pub mod avg_impl;
pub use avg_impl::*;

pub mod minmax_impl;
pub use minmax_impl::*;

pub mod variance_impl;
pub use variance_impl::*;

use crate::{
    aggregate::DescriptorBuilder,
    error::DescriptorError,
    expression::{
        ArithmeticOp, Expression, eq, gt, if_then_else, is_null, lit_bool, lit_double, lit_long, merge_slot, minus,
        operand, plus, slot, zero_of,
    },
    types::{DataType, SlotInfo},
};

/// Zero literal of a numeric type; non-numeric types are rejected the same
/// way binding `+` on them would be.
pub(crate) fn numeric_zero(ty: DataType) -> Result<Expression, DescriptorError> {
    zero_of(ty).ok_or(DescriptorError::ArithmeticTypes { op: ArithmeticOp::Add, left: ty, right: ty })
}

/// `if(is_null($0), unchanged, changed)`: rows whose operand is null leave a slot as is.
pub(crate) fn unless_null_operand(unchanged: Expression, changed: Expression) -> Expression {
    if_then_else(is_null(operand(0)), unchanged, changed)
}

/// Counts of NaN, +Infinity and -Infinity DOUBLE inputs, kept beside a float
/// running sum that only ever sees finite values.
///
/// A non-finite value added to a float sum cannot be subtracted back out
/// (`inf - inf` is NaN), so it is counted instead and rebuilt at finalize.
pub(crate) struct NonFiniteCounts {
    input: Expression,
}

impl NonFiniteCounts {
    const SLOTS: [(&'static str, f64); 3] = [
        ("nan_count", f64::NAN),
        ("pos_inf_count", f64::INFINITY),
        ("neg_inf_count", f64::NEG_INFINITY),
    ];

    /// `input` is the DOUBLE expression being summed, usually `$0`.
    pub(crate) fn new(input: Expression) -> Self {
        Self { input }
    }

    fn matches(&self, special: f64) -> Expression {
        // NaN equals itself under the total double order
        eq(self.input.clone(), lit_double(special))
    }

    fn is_non_finite(&self) -> Expression {
        if_then_else(
            self.matches(f64::NAN),
            lit_bool(true),
            if_then_else(self.matches(f64::INFINITY), lit_bool(true), self.matches(f64::NEG_INFINITY)),
        )
    }

    /// The input, or 0.0 when it is NaN or infinite.
    pub(crate) fn finite(&self) -> Expression {
        if_then_else(self.is_non_finite(), lit_double(0.0), self.input.clone())
    }

    /// Append the three counter slots and their expressions to `builder`.
    /// Call after the builder's own sets are in place.
    pub(crate) fn append_to(&self, mut builder: DescriptorBuilder) -> DescriptorBuilder {
        for (name, special) in Self::SLOTS {
            let count = || slot(name);
            builder.slots.push((name.to_string(), SlotInfo::non_null(DataType::Long)));
            builder.init.push(lit_long(0));
            builder.accumulate.push(unless_null_operand(
                count(),
                if_then_else(self.matches(special), plus(count(), lit_long(1)), count()),
            ));
            builder.retract.push(unless_null_operand(
                count(),
                if_then_else(self.matches(special), minus(count(), lit_long(1)), count()),
            ));
            builder.merge.push(plus(count(), merge_slot(name)));
        }
        builder
    }

    /// Sum-like result: NaN if any NaN or both infinities were seen, else
    /// the seen infinity, else `finite`.
    pub(crate) fn sum_result(finite: Expression) -> Expression {
        let seen = |name: &str| gt(slot(name), lit_long(0));
        if_then_else(
            seen("nan_count"),
            lit_double(f64::NAN),
            if_then_else(
                seen("pos_inf_count"),
                if_then_else(seen("neg_inf_count"), lit_double(f64::NAN), lit_double(f64::INFINITY)),
                if_then_else(seen("neg_inf_count"), lit_double(f64::NEG_INFINITY), finite),
            ),
        )
    }

    /// Spread-like result: NaN once any non-finite value was seen, else `finite`.
    pub(crate) fn nan_if_any(finite: Expression) -> Expression {
        let seen = |name: &str| gt(slot(name), lit_long(0));
        if_then_else(
            seen("nan_count"),
            lit_double(f64::NAN),
            if_then_else(
                seen("pos_inf_count"),
                lit_double(f64::NAN),
                if_then_else(seen("neg_inf_count"), lit_double(f64::NAN), finite),
            ),
        )
    }
}
