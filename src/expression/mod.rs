pub mod operators;
pub use operators::*;

pub mod expression;
pub use expression::*;

pub mod builder;
pub use builder::*;

pub mod bind;
pub use bind::*;

pub mod eval;
pub use eval::*;
