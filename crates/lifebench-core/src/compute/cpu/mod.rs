//! Host-side engines.

pub mod sequential;

pub use sequential::SequentialEngine;
