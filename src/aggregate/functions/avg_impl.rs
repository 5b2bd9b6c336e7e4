use crate::{
    aggregate::{AggregateDescriptor, AggregateImpl, functions::{NonFiniteCounts, numeric_zero, unless_null_operand}},
    error::DescriptorError,
    expression::{cast, divide, eq, if_then_else, lit_long, merge_slot, minus, null_of, operand, plus, slot},
    types::{DataType, SlotInfo},
};

/// AVG over a numeric type. LONG and DOUBLE average to DOUBLE, DECIMAL stays DECIMAL.
pub struct AvgImpl;

impl AvgImpl {
    pub fn result_type(operand: DataType) -> DataType {
        match operand {
            DataType::Decimal => DataType::Decimal,
            _ => DataType::Double,
        }
    }
}

impl AggregateImpl for AvgImpl {
    fn name(&self) -> &'static str { "avg" }

    fn signatures(&self) -> Vec<Vec<DataType>> {
        DataType::NUMERIC.iter().map(|t| vec![*t]).collect()
    }

    fn descriptor(&self, operand_types: &[DataType]) -> Result<AggregateDescriptor, DescriptorError> {
        let ty = operand_types.first().copied().unwrap_or(DataType::Long);
        let result = Self::result_type(ty);
        let (sum, count) = (|| slot("sum"), || slot("count"));
        let non_finite = (ty == DataType::Double).then(|| NonFiniteCounts::new(operand(0)));
        let input = || non_finite.as_ref().map_or_else(|| operand(0), NonFiniteCounts::finite);
        let average = divide(cast(sum(), result), cast(count(), result));
        let average = if non_finite.is_some() { NonFiniteCounts::sum_result(average) } else { average };

        let builder = AggregateDescriptor::builder(self.name(), result)
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
            // an empty group averages to null, never to a division by zero
            .finalize(if_then_else(eq(count(), lit_long(0)), null_of(result), average));

        match &non_finite {
            Some(counts) => counts.append_to(builder).build(),
            None => builder.build(),
        }
    }
}
