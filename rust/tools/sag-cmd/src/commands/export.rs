//! Export command implementation

use std::{
    fs::File,
    io::{self, BufWriter, Write},
};

use anyhow::{Context, Result};
use clap::ValueEnum;
use sag_reader::{SagReader, Schema};

use crate::{
    commands::{ReaderArgs, load_schema, open_reader},
    utils,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Tab-separated values with a header line, `\N` for nulls
    Tsv,
    /// One JSON object per row
    Ndjson,
}

/// Run the export command
pub fn run(
    map: String,
    format: ExportFormat,
    limit: Option<u64>,
    output: Option<String>,
    reader_args: ReaderArgs,
    file: String,
) -> Result<()> {
    let schema = load_schema(&map)?;
    let options = reader_args
        .to_options()
        .with_field_names(schema.field_names());
    let mut reader = open_reader(&file, options)?;
    reader
        .validate_fields(&schema.specs())
        .with_context(|| format!("Mapping {map} does not match {file}"))?;

    let sink: Box<dyn Write> = match &output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create output: {path}"))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(sink);
    let count = export_rows(&mut reader, &schema, format, limit, &mut writer)
        .with_context(|| format!("Failed to export {file}"))?;
    writer.flush().context("Failed to flush output")?;

    log::info!("exported {count} rows from {file}");
    if let Some(path) = output {
        println!("Exported {count} rows to {path}");
    }
    Ok(())
}

/// Writes up to `limit` resolved rows and returns the number written.
pub fn export_rows(
    reader: &mut SagReader,
    schema: &Schema,
    format: ExportFormat,
    limit: Option<u64>,
    out: &mut impl Write,
) -> Result<u64> {
    let specs = schema.specs();
    let columns = schema.column_names().collect::<Vec<_>>();
    let limit = limit.map_or(usize::MAX, |limit| {
        usize::try_from(limit).unwrap_or(usize::MAX)
    });

    if format == ExportFormat::Tsv {
        writeln!(out, "{}", columns.join("\t"))?;
    }
    let first_row = reader.curr_row();
    let mut count = 0;
    for row in reader.rows(&specs).take(limit) {
        let row = row.with_context(|| format!("Failed to resolve row {}", first_row + count))?;
        match format {
            ExportFormat::Tsv => utils::write_tsv_row(out, &row)?,
            ExportFormat::Ndjson => utils::write_json_row(out, &columns, &row)?,
        }
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sag_container::MemoryDriver;
    use sag_reader::{
        ReaderOptions, SagReader, generate_schema, mapping::parse_mapping,
    };
    use sag_testkit::data_gen::{SAMPLE_MAPPING, generate_galaxy_catalogue};

    use super::{ExportFormat, export_rows};

    fn reader(rows: usize) -> SagReader {
        let driver = MemoryDriver::new().with_container("cat", generate_galaxy_catalogue(rows));
        SagReader::open(
            Arc::new(driver),
            "cat",
            ReaderOptions::default().with_file_number(1),
        )
        .unwrap()
    }

    fn export(rows: usize, format: ExportFormat, limit: Option<u64>) -> (u64, String) {
        let schema =
            generate_schema(&parse_mapping(SAMPLE_MAPPING).unwrap(), "sag", "galaxies").unwrap();
        let mut out = Vec::new();
        let count = export_rows(&mut reader(rows), &schema, format, limit, &mut out).unwrap();
        (count, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_export_tsv() {
        let (count, text) = export(8, ExportFormat::Tsv, None);
        assert_eq!(count, 8);
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 9);
        assert!(lines[0].starts_with("galaxy_id\thalo_mass\tsfr\tx\tdb_id\t"));

        let fields = lines[7].split('\t').collect::<Vec<_>>();
        assert_eq!(fields.len(), 11);
        assert_eq!(fields[0], "1006");
        assert_eq!(fields[4], "1063000000");
        assert_eq!(fields[5], "63");
        assert_eq!(fields[7], "1");
        assert_eq!(fields[8], "7");
        assert_eq!(fields[9], "\\N");
        assert_eq!(fields[10], "\\N");
    }

    #[test]
    fn test_export_ndjson_with_limit() {
        let (count, text) = export(10, ExportFormat::Ndjson, Some(3));
        assert_eq!(count, 3);
        let rows = text
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2]["galaxy_id"], 1002);
        assert_eq!(rows[2]["db_id"], 1063000002i64);
        assert_eq!(rows[2]["n_in_file"], 3);
        assert!(rows[2]["forest_id"].is_null());
        assert!(rows[2]["halo_mass"].is_f64());
    }

    #[test]
    fn test_export_reserved_fields_only() {
        let mapping = "\
dbId     INT8  db_id      BIGINT
NInFile  INT8  n_in_file  BIGINT
forestId INT8  forest_id  BIGINT
";
        let schema = generate_schema(&parse_mapping(mapping).unwrap(), "sag", "ids").unwrap();
        let driver = MemoryDriver::new().with_container("cat", generate_galaxy_catalogue(8));
        let options = ReaderOptions::default()
            .with_file_number(1)
            .with_field_names(schema.field_names());
        let mut reader = SagReader::open(Arc::new(driver), "cat", options).unwrap();
        reader.validate_fields(&schema.specs()).unwrap();

        let mut out = Vec::new();
        let count = export_rows(&mut reader, &schema, ExportFormat::Tsv, None, &mut out).unwrap();
        assert_eq!(count, 8);
        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "db_id\tn_in_file\tforest_id");
        assert_eq!(lines[8], "1063000001\t8\t\\N");
    }

    #[test]
    fn test_export_empty_catalogue() {
        let (count, text) = export(0, ExportFormat::Tsv, None);
        assert_eq!(count, 0);
        assert_eq!(text.lines().count(), 1);
    }
}
