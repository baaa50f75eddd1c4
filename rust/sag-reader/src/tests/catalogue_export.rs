use std::sync::Arc;

use sag_common::error::ErrorKind;
use sag_container::{ArrayContainer, JsonContainerDriver, MemoryDriver, ScalarKind, TypedBuffer};
use sag_testkit::{
    data_gen::{CatalogueParams, HALO_MASS, SAMPLE_MAPPING, add_int32_column, generate_catalogue},
    fixtures::{write_catalogue_json, write_mapping_file},
};

use crate::{
    ReaderOptions, Resolution, ResolvedField, SagReader, Value,
    mapping::{parse_mapping, read_mapping_file},
    resolve::{ConstantField, NullField},
    schema::generate_schema,
};

#[test]
fn test_export_rows_from_json_catalogue() {
    let params = CatalogueParams {
        rows: 8,
        snapshot: 12,
        redshift: 1.25,
        seed: 7,
    };
    let container = generate_catalogue(&params);
    let halo_mass = match container.read_range(HALO_MASS, 0, 8, ScalarKind::Float32) {
        Ok(TypedBuffer::Float32(values)) => values,
        other => panic!("unexpected halo mass read: {other:?}"),
    };
    let catalogue = write_catalogue_json(&container).unwrap();
    let mapping = write_mapping_file(SAMPLE_MAPPING).unwrap();

    let schema = generate_schema(&read_mapping_file(mapping.path()).unwrap(), "sag", "galaxies")
        .unwrap();
    let specs = schema.specs();
    let options = ReaderOptions::default()
        .with_file_number(3)
        .with_block_size(3)
        .with_field_names(schema.field_names());
    let mut reader =
        SagReader::open(Arc::new(JsonContainerDriver), catalogue.path(), options).unwrap();
    reader.validate_fields(&specs).unwrap();

    let rows = reader.rows(&specs).collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(rows.len(), 8);

    let columns = schema.column_names().collect::<Vec<_>>();
    let at = |row: &[ResolvedField], column: &str| {
        let index = columns.iter().position(|c| *c == column).unwrap();
        row[index].clone()
    };
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.len(), schema.len());
        assert_eq!(at(row, "galaxy_id").value, Value::Int64(1000 + i as i64));
        assert_eq!(at(row, "halo_mass").value, Value::Float32(halo_mass[i]));
        assert_eq!(at(row, "snapnum").value, Value::Int32(12));
        assert_eq!(at(row, "redshift").value, Value::Float32(1.25));
        assert_eq!(at(row, "file_num").value, Value::Int32(3));
        assert_eq!(at(row, "n_in_file").value, Value::Int64(i as i64 + 1));
        assert_eq!(
            at(row, "db_id").value,
            Value::Int64(3_012_000_000 + (i % 3) as i64)
        );
        assert_eq!(at(row, "forest_id"), ResolvedField::null(Value::Int64(0)));
        assert_eq!(at(row, "ix"), ResolvedField::null(Value::Int32(0)));
        assert!(!at(row, "x").is_null);
    }
}

#[test]
fn test_classify_mapping() {
    let container = generate_catalogue(&CatalogueParams::default());
    let driver = MemoryDriver::new().with_container("cat", container);
    let reader = SagReader::open(Arc::new(driver), "cat", ReaderOptions::default()).unwrap();

    let mappings = parse_mapping(SAMPLE_MAPPING).unwrap();
    let resolutions = mappings
        .iter()
        .map(|m| reader.classify(&m.source_name).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(resolutions[1], Resolution::Column(HALO_MASS.to_string()));
    assert_eq!(resolutions[4], Resolution::ComputedId);
    assert_eq!(resolutions[5], Resolution::Constant(ConstantField::Snapnum));
    assert_eq!(resolutions[9], Resolution::Null(NullField::ForestId));
    assert_eq!(resolutions[4].to_string(), "computed dbId");
}

#[test]
fn test_validate_rejects_unmapped_field() {
    let driver = MemoryDriver::new().with_container("cat", generate_catalogue(&Default::default()));
    let reader = SagReader::open(Arc::new(driver), "cat", ReaderOptions::default()).unwrap();
    let mappings = parse_mapping("/Galaxies/Nope REAL4 nope REAL\n").unwrap();
    let schema = generate_schema(&mappings, "sag", "galaxies").unwrap();
    let err = reader.validate_fields(&schema.specs()).unwrap_err();
    match err.kind() {
        ErrorKind::UnmappedField { field } => assert_eq!(field, "/Galaxies/Nope"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_rows_stop_after_error() {
    let mut container = generate_catalogue(&CatalogueParams::with_rows(5));
    add_int32_column(&mut container, "/Galaxies/Type", 5);
    let driver = MemoryDriver::new().with_container("cat", container);
    let mut reader = SagReader::open(Arc::new(driver), "cat", ReaderOptions::default()).unwrap();

    let specs = generate_schema(&parse_mapping(SAMPLE_MAPPING).unwrap(), "sag", "galaxies")
        .unwrap()
        .specs();
    let mut rows = reader.rows(&specs);
    let err = rows.next().unwrap().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnsupportedColumnType { .. }));
    assert!(rows.next().is_none());
}

#[test]
fn test_rows_resume_from_position() {
    let driver = MemoryDriver::new()
        .with_container("cat", generate_catalogue(&CatalogueParams::with_rows(10)));
    let mut reader = SagReader::open(Arc::new(driver), "cat", ReaderOptions::default()).unwrap();
    let specs = generate_schema(&parse_mapping(SAMPLE_MAPPING).unwrap(), "sag", "galaxies")
        .unwrap()
        .specs();

    reader.set_curr_row(8).unwrap();
    let rows = reader.rows(&specs).collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0].value, Value::Int64(1008));
    assert_eq!(rows[1][8].value, Value::Int64(10));
}
