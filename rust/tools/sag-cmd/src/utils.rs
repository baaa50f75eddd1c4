//! Common utilities for sag-cmd

use std::{io::Write, path::Path};

use anyhow::Result;
use sag_reader::ResolvedField;

/// Checks if a file exists and is readable
pub fn validate_file_exists(path: &str) -> Result<()> {
    let file_path = Path::new(path);
    if !file_path.exists() {
        anyhow::bail!("File does not exist: {}", path);
    }
    if !file_path.is_file() {
        anyhow::bail!("Path is not a file: {}", path);
    }
    Ok(())
}

/// Text form of a field in tab-separated output; nulls are written as `\N`.
pub fn format_tsv_field(field: &ResolvedField) -> String {
    match field.get() {
        Some(value) => value.to_string(),
        None => "\\N".to_string(),
    }
}

pub fn write_tsv_row(out: &mut impl Write, row: &[ResolvedField]) -> Result<()> {
    let line = row.iter().map(format_tsv_field).collect::<Vec<_>>().join("\t");
    writeln!(out, "{line}")?;
    Ok(())
}

/// Writes a row as one JSON object keyed by destination column.
pub fn write_json_row(out: &mut impl Write, columns: &[&str], row: &[ResolvedField]) -> Result<()> {
    let mut object = serde_json::Map::with_capacity(columns.len());
    for (column, field) in columns.iter().zip(row) {
        let value = match field.get() {
            Some(value) => serde_json::to_value(value)?,
            None => serde_json::Value::Null,
        };
        object.insert(column.to_string(), value);
    }
    serde_json::to_writer(&mut *out, &object)?;
    writeln!(out)?;
    Ok(())
}
