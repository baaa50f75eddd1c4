//! Parser for column mapping files.
//!
//! Each non-blank line that does not start with `#` maps one source field
//! onto one destination column:
//!
//! ```text
//! # source            source type  column      column type
//! /Galaxies/HaloMass  REAL4        halo_mass   REAL
//! dbId                INT8         db_id       BIGINT
//! ```
//!
//! Tokens after the fourth are ignored.

use std::{fs, path::Path};

use sag_common::{Result, error::Error};

use crate::{schema::DbType, value::DataType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub source_name: String,
    pub source_type: DataType,
    pub column_name: String,
    pub db_type: DbType,
    /// 1-based line in the mapping file.
    pub line: usize,
}

/// Parses the text of a mapping file.
pub fn parse_mapping(text: &str) -> Result<Vec<FieldMapping>> {
    let mut mappings = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens = line.split_whitespace().collect::<Vec<_>>();
        let &[source_name, source_type, column_name, db_type, ..] = tokens.as_slice() else {
            return Err(Error::invalid_format(
                format!("mapping line {line_number}"),
                format!("expected 4 tokens, found {}", tokens.len()),
            ));
        };
        let located = |e: Error| {
            Error::invalid_format(format!("mapping line {line_number}"), e.to_string())
        };
        mappings.push(FieldMapping {
            source_name: source_name.to_string(),
            source_type: source_type.parse().map_err(located)?,
            column_name: column_name.to_string(),
            db_type: db_type.parse().map_err(located)?,
            line: line_number,
        });
    }
    Ok(mappings)
}

/// Reads and parses a mapping file.
pub fn read_mapping_file(path: &Path) -> Result<Vec<FieldMapping>> {
    let text = fs::read_to_string(path)
        .map_err(|e| Error::io(format!("read mapping file {}", path.display()), e))?;
    let mappings = parse_mapping(&text)?;
    log::info!(
        "loaded {} field mappings from {}",
        mappings.len(),
        path.display()
    );
    Ok(mappings)
}
