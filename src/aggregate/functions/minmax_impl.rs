use crate::{
    aggregate::{AggregateDescriptor, AggregateImpl, RetractMode, functions::unless_null_operand},
    error::DescriptorError,
    expression::{
        Expression, eq, gt, if_then_else, is_null, lit_bool, lit_long, lt, lt_eq, merge_slot, minus, null_of, operand, plus,
        slot,
    },
    types::{DataType, SlotInfo},
};

pub struct MinImpl;
pub struct MaxImpl;

impl AggregateImpl for MinImpl {
    fn name(&self) -> &'static str { "min" }
    fn signatures(&self) -> Vec<Vec<DataType>> { extremum_signatures() }
    fn descriptor(&self, operand_types: &[DataType]) -> Result<AggregateDescriptor, DescriptorError> {
        extremum_descriptor(self.name(), Mode::Min, operand_types)
    }
}

impl AggregateImpl for MaxImpl {
    fn name(&self) -> &'static str { "max" }
    fn signatures(&self) -> Vec<Vec<DataType>> { extremum_signatures() }
    fn descriptor(&self, operand_types: &[DataType]) -> Result<AggregateDescriptor, DescriptorError> {
        extremum_descriptor(self.name(), Mode::Max, operand_types)
    }
}

#[derive(Clone, Copy)]
enum Mode { Min, Max }

impl Mode {
    /// `candidate` beats `current`.
    fn better(self, candidate: Expression, current: Expression) -> Expression {
        match self {
            Mode::Min => lt(candidate, current),
            Mode::Max => gt(candidate, current),
        }
    }
}

fn extremum_signatures() -> Vec<Vec<DataType>> {
    DataType::ALL.iter().map(|t| vec![*t]).collect()
}

/// `if(is_null(current), candidate, if(candidate beats current, candidate, current))`
fn pick(mode: Mode, current: Expression, candidate: Expression) -> Expression {
    if_then_else(
        is_null(current.clone()),
        candidate.clone(),
        if_then_else(mode.better(candidate.clone(), current.clone()), candidate, current),
    )
}

/// Buffer `{value, count}`: the extreme so far and the number of non-null
/// rows it covers. The count lets retraction of the last row restore the
/// empty (null) state. Retracting the current extreme while other rows
/// remain is refused by the retract guard; see [`RetractMode::ExtremaOnly`].
fn extremum_descriptor(name: &str, mode: Mode, operand_types: &[DataType]) -> Result<AggregateDescriptor, DescriptorError> {
    let ty = operand_types.first().copied().unwrap_or(DataType::Long);
    let (value, count) = (|| slot("value"), || slot("count"));

    AggregateDescriptor::builder(name, ty)
        .operands(operand_types)
        .slot("value", SlotInfo::nullable(ty))
        .slot("count", SlotInfo::non_null(DataType::Long))
        .retract_mode(RetractMode::ExtremaOnly)
        .init(vec![
            /* value = */ null_of(ty),
            /* count = */ lit_long(0),
        ])
        .accumulate(vec![
            /* value = */ unless_null_operand(value(), pick(mode, value(), operand(0))),
            /* count = */ unless_null_operand(count(), plus(count(), lit_long(1))),
        ])
        .retract(vec![
            /* value = */ unless_null_operand(value(), if_then_else(lt_eq(count(), lit_long(1)), null_of(ty), value())),
            /* count = */ unless_null_operand(count(), minus(count(), lit_long(1))),
        ])
        // a null operand compares to null, which never trips the guard
        .retract_guard(if_then_else(gt(count(), lit_long(1)), eq(operand(0), value()), lit_bool(false)))
        .merge(vec![
            /* value = */ if_then_else(is_null(merge_slot("value")), value(), pick(mode, value(), merge_slot("value"))),
            /* count = */ plus(count(), merge_slot("count")),
        ])
        .finalize(value())
        .build()
}
