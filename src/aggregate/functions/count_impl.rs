use crate::{
    aggregate::{AggregateDescriptor, AggregateImpl, functions::unless_null_operand},
    error::DescriptorError,
    expression::{lit_long, merge_slot, minus, plus, slot},
    types::{DataType, SlotInfo},
};

/// COUNT(expr) for every type, and COUNT(*) as the zero-operand signature.
///
/// The counter starts at 0 and the result is never null: a group whose
/// inputs were all null reports 0, which keeps "counted nothing" apart from
/// "no data".
pub struct CountImpl;

impl AggregateImpl for CountImpl {
    fn name(&self) -> &'static str { "count" }

    fn signatures(&self) -> Vec<Vec<DataType>> {
        let mut sigs = vec![vec![]];
        sigs.extend(DataType::ALL.iter().map(|t| vec![*t]));
        sigs
    }

    fn descriptor(&self, operand_types: &[DataType]) -> Result<AggregateDescriptor, DescriptorError> {
        let count = || slot("count");
        let builder = AggregateDescriptor::builder(self.name(), DataType::Long)
            .operands(operand_types)
            .slot("count", SlotInfo::non_null(DataType::Long))
            .non_null_result()
            .init(vec![/* count = */ lit_long(0)])
            .merge(vec![/* count = */ plus(count(), merge_slot("count"))])
            .finalize(count());

        // COUNT(*) counts every row, COUNT(expr) skips nulls
        let builder = if operand_types.is_empty() {
            builder
                .accumulate(vec![/* count = */ plus(count(), lit_long(1))])
                .retract(vec![/* count = */ minus(count(), lit_long(1))])
        } else {
            builder
                .accumulate(vec![/* count = */ unless_null_operand(count(), plus(count(), lit_long(1)))])
                .retract(vec![/* count = */ unless_null_operand(count(), minus(count(), lit_long(1)))])
        };
        builder.build()
    }
}
