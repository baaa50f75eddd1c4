//! Core definitions (error and result types, helper macros), relied upon by all sag-* crates.

pub mod error;
pub mod macros;
pub mod result;

pub use result::Result;
