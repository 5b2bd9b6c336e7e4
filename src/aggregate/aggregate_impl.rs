use crate::{aggregate::AggregateDescriptor, error::DescriptorError, types::DataType};

/// Factory for the descriptors of one aggregate name.
/// Only consulted while a registry is populated: every accepted signature
/// becomes its own immutable descriptor, and evaluation never goes through
/// this trait.
pub trait AggregateImpl: Send + Sync {
    /// Canonical lowercase function name ("count", "sum", ...).
    fn name(&self) -> &'static str;

    /// Argument type lists this aggregate accepts.
    fn signatures(&self) -> Vec<Vec<DataType>>;

    /// Build the descriptor for one signature.
    fn descriptor(&self, operand_types: &[DataType]) -> Result<AggregateDescriptor, DescriptorError>;
}
