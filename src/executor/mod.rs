pub mod event;
pub use event::*;

pub mod evaluator;
pub use evaluator::*;

#[cfg(test)]
mod _tests;
