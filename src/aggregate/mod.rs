pub mod descriptor;
pub use descriptor::*;

pub mod buffer;
pub use buffer::*;

pub mod aggregate_impl;
pub use aggregate_impl::*;

pub mod aggregate_registry;
pub use aggregate_registry::*;

pub mod functions;
pub use functions::*;
