//! Utility functions and helper types.

pub mod patterns;

// Re-export utilities
pub use patterns::*;
