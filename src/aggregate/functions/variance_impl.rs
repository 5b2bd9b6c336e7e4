use crate::{
    aggregate::{AggregateDescriptor, AggregateImpl, functions::{NonFiniteCounts, unless_null_operand}},
    error::DescriptorError,
    expression::{
        Expression, cast, divide, if_then_else, lit_double, lit_long, lt, lt_eq, merge_slot, minus, null_of, operand,
        plus, slot, sqrt, times,
    },
    types::{DataType, SlotInfo},
};

/// Population / sample variance and standard deviation over a numeric type.
///
/// The buffer keeps `count`, `sum` and `sum_sq` of the operand cast to
/// DOUBLE; all three are plain sums, so retraction and merge are exact
/// inverses of accumulation and each other. For DOUBLE operands only finite
/// values enter the sums; a group holding NaN or an infinity results in NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarianceImpl {
    name: &'static str,
    sample: bool,
    root: bool,
}

impl VarianceImpl {
    pub const VAR_POP: VarianceImpl = VarianceImpl { name: "var_pop", sample: false, root: false };
    pub const VAR_SAMP: VarianceImpl = VarianceImpl { name: "var_samp", sample: true, root: false };
    pub const STDDEV_POP: VarianceImpl = VarianceImpl { name: "stddev_pop", sample: false, root: true };
    pub const STDDEV_SAMP: VarianceImpl = VarianceImpl { name: "stddev_samp", sample: true, root: true };

    /// Finalize: null below the minimum row count, otherwise
    /// `(sum_sq - sum * sum / n) / (n or n - 1)`, clamped at zero against
    /// rounding, optionally square-rooted.
    fn finalize(&self, non_finite: bool) -> Expression {
        let n = || cast(slot("count"), DataType::Double);
        let m2 = minus(slot("sum_sq"), divide(times(slot("sum"), slot("sum")), n()));
        let denominator = if self.sample { minus(n(), lit_double(1.0)) } else { n() };
        let variance = divide(m2, denominator);
        let clamped = if_then_else(lt(variance.clone(), lit_double(0.0)), lit_double(0.0), variance);
        let value = if self.root { sqrt(clamped) } else { clamped };
        let value = if non_finite { NonFiniteCounts::nan_if_any(value) } else { value };

        let min_rows = if self.sample { 1 } else { 0 };
        if_then_else(lt_eq(slot("count"), lit_long(min_rows)), null_of(DataType::Double), value)
    }
}

impl AggregateImpl for VarianceImpl {
    fn name(&self) -> &'static str { self.name }

    fn signatures(&self) -> Vec<Vec<DataType>> {
        DataType::NUMERIC.iter().map(|t| vec![*t]).collect()
    }

    fn descriptor(&self, operand_types: &[DataType]) -> Result<AggregateDescriptor, DescriptorError> {
        let non_finite = (operand_types.first() == Some(&DataType::Double)).then(|| NonFiniteCounts::new(operand(0)));
        let x = || non_finite.as_ref().map_or_else(|| cast(operand(0), DataType::Double), NonFiniteCounts::finite);
        let (count, sum, sum_sq) = (|| slot("count"), || slot("sum"), || slot("sum_sq"));

        let builder = AggregateDescriptor::builder(self.name, DataType::Double)
            .operands(operand_types)
            .slot("count", SlotInfo::non_null(DataType::Long))
            .slot("sum", SlotInfo::non_null(DataType::Double))
            .slot("sum_sq", SlotInfo::non_null(DataType::Double))
            .init(vec![
                /* count = */ lit_long(0),
                /* sum = */ lit_double(0.0),
                /* sum_sq = */ lit_double(0.0),
            ])
            .accumulate(vec![
                /* count = */ unless_null_operand(count(), plus(count(), lit_long(1))),
                /* sum = */ unless_null_operand(sum(), plus(sum(), x())),
                /* sum_sq = */ unless_null_operand(sum_sq(), plus(sum_sq(), times(x(), x()))),
            ])
            .retract(vec![
                /* count = */ unless_null_operand(count(), minus(count(), lit_long(1))),
                /* sum = */ unless_null_operand(sum(), minus(sum(), x())),
                /* sum_sq = */ unless_null_operand(sum_sq(), minus(sum_sq(), times(x(), x()))),
            ])
            .merge(vec![
                /* count = */ plus(count(), merge_slot("count")),
                /* sum = */ plus(sum(), merge_slot("sum")),
                /* sum_sq = */ plus(sum_sq(), merge_slot("sum_sq")),
            ])
            .finalize(self.finalize(non_finite.is_some()));

        match &non_finite {
            Some(counts) => counts.append_to(builder).build(),
            None => builder.build(),
        }
    }
}
