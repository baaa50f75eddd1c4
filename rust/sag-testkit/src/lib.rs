//! Test utilities for the SAG reader workspace.
//!
//! - `data_gen`: synthetic galaxy catalogues held in memory
//! - `fixtures`: catalogue and mapping files written to temporary locations

pub mod data_gen;
pub mod fixtures;
