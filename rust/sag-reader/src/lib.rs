//! Block-wise reader for SAG galaxy catalogues.
//!
//! The catalogue is a set of equal-length columns stored as arrays in a
//! hierarchical container. The reader walks the container once to collect the
//! column names, then pulls fixed-size row blocks from every column in
//! lockstep. Row consumers resolve logical fields through [`SagReader`]:
//! data columns, per-file constants, the synthesized `dbId` and null
//! placeholders.

pub mod block;
pub mod cursor;
pub mod mapping;
pub mod meta;
pub mod reader;
pub mod resolve;
pub mod scan;
pub mod schema;
pub mod value;

#[cfg(test)]
mod tests;

pub use reader::{ReaderOptions, Rows, SagReader};
pub use resolve::{FieldResolver, IdFactors, Resolution};
pub use schema::{FieldSpec, Schema, generate_schema};
pub use value::{DataType, ResolvedField, Value};
