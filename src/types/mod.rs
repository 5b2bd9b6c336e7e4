pub mod data_type;
pub use data_type::*;

pub mod value;
pub use value::*;

pub mod slot_info;
pub use slot_info::*;

pub mod buffer_layout;
pub use buffer_layout::*;
