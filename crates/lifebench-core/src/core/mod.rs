//! Grid, update rule, validation and error types.

pub mod error;
pub mod grid;
pub mod rule;
pub mod validation;

// Re-export core types
pub use error::*;
pub use grid::*;
pub use validation::*;
