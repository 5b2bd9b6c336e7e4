pub mod descriptor_error;
pub use descriptor_error::*;

pub mod registry_error;
pub use registry_error::*;

pub mod evaluation_error;
pub use evaluation_error::*;
