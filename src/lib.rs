pub mod config;
pub use config::{EvalConfig, OverflowPolicy};

pub mod error;
pub mod types;
pub use types::{DataType, Value};

pub mod expression;

pub mod aggregate;
pub use aggregate::{AggregateBuffer, AggregateDescriptor, AggregateRegistry, DescriptorBuilder, RetractMode};

pub mod executor;
pub use executor::{AggEvent, Evaluator, RowKind};
