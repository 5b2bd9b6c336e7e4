use crate::{
    aggregate::{AggregateDescriptor, AggregateImpl, functions::{NonFiniteCounts, numeric_zero, unless_null_operand}},
    error::DescriptorError,
    expression::{eq, if_then_else, lit_long, merge_slot, minus, null_of, operand, plus, slot},
    types::{DataType, SlotInfo},
};

/// SUM over a numeric type; null when no non-null row is left.
///
/// The buffer keeps a non-null running sum next to a row count instead of a
/// nullable sum. Retracting the last row then lands exactly on the initial
/// buffer, and the count decides between null and the sum at finalize.
/// DOUBLE sums only add finite values; NaN and infinities are counted in
/// three extra counter slots.
pub struct SumImpl;

impl AggregateImpl for SumImpl {
    fn name(&self) -> &'static str { "sum" }

    fn signatures(&self) -> Vec<Vec<DataType>> {
        DataType::NUMERIC.iter().map(|t| vec![*t]).collect()
    }

    fn descriptor(&self, operand_types: &[DataType]) -> Result<AggregateDescriptor, DescriptorError> {
        let ty = operand_types.first().copied().unwrap_or(DataType::Long);
        let (sum, count) = (|| slot("sum"), || slot("count"));
        let non_finite = (ty == DataType::Double).then(|| NonFiniteCounts::new(operand(0)));
        let input = || non_finite.as_ref().map_or_else(|| operand(0), NonFiniteCounts::finite);
        let result = if non_finite.is_some() { NonFiniteCounts::sum_result(sum()) } else { sum() };

        let builder = AggregateDescriptor::builder(self.name(), ty)
            .operands(operand_types)
            .slot("sum", SlotInfo::non_null(ty))
            .slot("count", SlotInfo::non_null(DataType::Long))
            .init(vec![
                /* sum = */ numeric_zero(ty)?,
                /* count = */ lit_long(0),
            ])
            .accumulate(vec![
                /* sum = */ unless_null_operand(sum(), plus(sum(), input())),
                /* count = */ unless_null_operand(count(), plus(count(), lit_long(1))),
            ])
            .retract(vec![
                /* sum = */ unless_null_operand(sum(), minus(sum(), input())),
                /* count = */ unless_null_operand(count(), minus(count(), lit_long(1))),
            ])
            .merge(vec![
                /* sum = */ plus(sum(), merge_slot("sum")),
                /* count = */ plus(count(), merge_slot("count")),
            ])
            .finalize(if_then_else(eq(count(), lit_long(0)), null_of(ty), result));

        match &non_finite {
            Some(counts) => counts.append_to(builder).build(),
            None => builder.build(),
        }
    }
}

/// SUM0: like SUM, but an empty group sums to zero instead of null.
pub struct Sum0Impl;

impl AggregateImpl for Sum0Impl {
    fn name(&self) -> &'static str { "sum0" }

    fn signatures(&self) -> Vec<Vec<DataType>> {
        DataType::NUMERIC.iter().map(|t| vec![*t]).collect()
    }

    fn descriptor(&self, operand_types: &[DataType]) -> Result<AggregateDescriptor, DescriptorError> {
        let ty = operand_types.first().copied().unwrap_or(DataType::Long);
        let sum = || slot("sum");
        let non_finite = (ty == DataType::Double).then(|| NonFiniteCounts::new(operand(0)));
        let input = || non_finite.as_ref().map_or_else(|| operand(0), NonFiniteCounts::finite);
        let result = if non_finite.is_some() { NonFiniteCounts::sum_result(sum()) } else { sum() };

        let builder = AggregateDescriptor::builder(self.name(), ty)
            .operands(operand_types)
            .slot("sum", SlotInfo::non_null(ty))
            .non_null_result()
            .init(vec![/* sum = */ numeric_zero(ty)?])
            .accumulate(vec![/* sum = */ unless_null_operand(sum(), plus(sum(), input()))])
            .retract(vec![/* sum = */ unless_null_operand(sum(), minus(sum(), input()))])
            .merge(vec![/* sum = */ plus(sum(), merge_slot("sum"))])
            .finalize(result);

        match &non_finite {
            Some(counts) => counts.append_to(builder).build(),
            None => builder.build(),
        }
    }
}
