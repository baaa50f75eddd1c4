//! Validate command implementation

use anyhow::{Result, bail};
use sag_reader::{SagReader, Schema};

use crate::commands::{ReaderArgs, load_schema, open_reader};

/// Run the validate command
pub fn run(map: String, reader_args: ReaderArgs, file: String) -> Result<()> {
    let schema = load_schema(&map)?;
    let reader = open_reader(&file, reader_args.to_options())?;
    println!("Validating {} fields of {map} against {file}", schema.len());

    let unmapped = print_resolutions(&reader, &schema);
    if unmapped > 0 {
        bail!("{unmapped} of {} fields cannot be resolved", schema.len());
    }
    println!("All fields resolve");
    Ok(())
}

/// Prints one line per schema item and returns the number of unmapped fields.
fn print_resolutions(reader: &SagReader, schema: &Schema) -> usize {
    let mut unmapped = 0;
    for item in &schema.items {
        let resolution = match reader.classify(&item.spec.name) {
            Ok(resolution) => resolution.to_string(),
            Err(e) => {
                unmapped += 1;
                format!("UNMAPPED ({e})")
            }
        };
        println!(
            "  {:<24} {:<10} {:<28} {resolution}",
            item.column_name,
            item.db_type.name(),
            item.spec.name
        );
    }
    unmapped
}
