//! Resolution of logical fields against the row under the cursor.
//!
//! A row-sourced field name is looked up in this order, first match wins:
//! 1. a loaded data column (`/Galaxies/HaloMass`, leading `/` optional);
//! 2. a per-file constant (`snapnum`, `redshift`, `fileNum`, `NInFile`);
//! 3. the computed identifier `dbId`;
//! 4. a null placeholder (`forestId`, `depthFirstId`, `phkey`, `ix`, `iy`, `iz`).
//!
//! Anything else is an `UnmappedField` error.

use std::fmt;

use sag_common::{Result, error::Error};
use sag_container::path;
use serde::Serialize;

use crate::{
    cursor::{CursorState, RowCursor},
    meta::FileMeta,
    schema::{FieldSource, FieldSpec},
    value::{ResolvedField, Value},
};

pub const DB_ID_FIELD: &str = "dbId";

/// Multipliers combining file number, snapshot and row into a `dbId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdFactors {
    pub snapshot_factor: i64,
    pub row_factor: i64,
}

impl Default for IdFactors {
    fn default() -> Self {
        IdFactors {
            snapshot_factor: 1000,
            row_factor: 1_000_000,
        }
    }
}

impl IdFactors {
    pub fn new(snapshot_factor: i64, row_factor: i64) -> IdFactors {
        IdFactors {
            snapshot_factor,
            row_factor,
        }
    }

    /// `(file_number * snapshot_factor + snapshot) * row_factor + row`.
    pub fn db_id(&self, file_number: i32, snapshot: i32, row: i64) -> Result<i64> {
        i64::from(file_number)
            .checked_mul(self.snapshot_factor)
            .and_then(|v| v.checked_add(snapshot.into()))
            .and_then(|v| v.checked_mul(self.row_factor))
            .and_then(|v| v.checked_add(row))
            .ok_or_else(|| {
                Error::invalid_arg(
                    "id_factors",
                    format!("dbId overflows for file {file_number}, snapshot {snapshot}"),
                )
            })
    }
}

/// Fields whose value is constant for the whole file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstantField {
    Snapnum,
    Redshift,
    FileNum,
    NInFile,
}

impl ConstantField {
    pub const ALL: [ConstantField; 4] = [
        ConstantField::Snapnum,
        ConstantField::Redshift,
        ConstantField::FileNum,
        ConstantField::NInFile,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ConstantField::Snapnum => "snapnum",
            ConstantField::Redshift => "redshift",
            ConstantField::FileNum => "fileNum",
            ConstantField::NInFile => "NInFile",
        }
    }

    pub fn from_name(name: &str) -> Option<ConstantField> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    fn value(&self, cursor: &RowCursor, meta: &FileMeta) -> Result<Value> {
        let value = match self {
            ConstantField::Snapnum => Value::Int32(meta.snapshot),
            ConstantField::Redshift => Value::Float32(meta.redshift),
            ConstantField::FileNum => Value::Int32(meta.file_number),
            ConstantField::NInFile => Value::Int64(i64::try_from(cursor.curr_row()).map_err(
                |_| Error::invalid_operation(format!("row {} exceeds int64", cursor.curr_row())),
            )?),
        };
        Ok(value)
    }
}

/// Fields without a source in the catalogue, resolved to a typed null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NullField {
    ForestId,
    DepthFirstId,
    Phkey,
    Ix,
    Iy,
    Iz,
}

impl NullField {
    pub const ALL: [NullField; 6] = [
        NullField::ForestId,
        NullField::DepthFirstId,
        NullField::Phkey,
        NullField::Ix,
        NullField::Iy,
        NullField::Iz,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NullField::ForestId => "forestId",
            NullField::DepthFirstId => "depthFirstId",
            NullField::Phkey => "phkey",
            NullField::Ix => "ix",
            NullField::Iy => "iy",
            NullField::Iz => "iz",
        }
    }

    pub fn from_name(name: &str) -> Option<NullField> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    /// The zero value carried by the null.
    pub fn zero(&self) -> Value {
        match self {
            NullField::ForestId | NullField::DepthFirstId | NullField::Phkey => Value::Int64(0),
            NullField::Ix | NullField::Iy | NullField::Iz => Value::Int32(0),
        }
    }
}

/// How a row-sourced field name is answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "field", rename_all = "snake_case")]
pub enum Resolution {
    Column(String),
    Constant(ConstantField),
    ComputedId,
    Null(NullField),
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Column(name) => write!(f, "column {name}"),
            Resolution::Constant(field) => write!(f, "constant {}", field.name()),
            Resolution::ComputedId => write!(f, "computed {DB_ID_FIELD}"),
            Resolution::Null(field) => write!(f, "null {}", field.name()),
        }
    }
}

/// Returns `true` if `name` is answered without a data column.
pub fn is_reserved(name: &str) -> bool {
    ConstantField::from_name(name).is_some()
        || name == DB_ID_FIELD
        || NullField::from_name(name).is_some()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FieldResolver {
    factors: IdFactors,
}

impl FieldResolver {
    pub fn new(factors: IdFactors) -> FieldResolver {
        FieldResolver { factors }
    }

    /// Classifies `name` against a list of column names without reading data.
    pub fn classify(&self, name: &str, columns: &[String]) -> Result<Resolution> {
        let column = path::normalize(name);
        if columns.iter().any(|c| path::normalize(c) == column) {
            return Ok(Resolution::Column(column.into_owned()));
        }
        if let Some(field) = ConstantField::from_name(name) {
            return Ok(Resolution::Constant(field));
        }
        if name == DB_ID_FIELD {
            return Ok(Resolution::ComputedId);
        }
        if let Some(field) = NullField::from_name(name) {
            return Ok(Resolution::Null(field));
        }
        Err(Error::unmapped_field(name))
    }

    /// Checks that every row-sourced spec resolves against `columns`.
    pub fn validate(&self, specs: &[FieldSpec], columns: &[String]) -> Result<()> {
        for spec in specs {
            match spec.source {
                FieldSource::Row => {
                    self.classify(&spec.name, columns)?;
                }
                FieldSource::Header => return Err(header_error(spec)),
                FieldSource::Constant(_) => (),
            }
        }
        Ok(())
    }

    /// Returns the value of `spec` at the row under `cursor`.
    pub fn resolve(
        &self,
        spec: &FieldSpec,
        cursor: &RowCursor,
        meta: &FileMeta,
    ) -> Result<ResolvedField> {
        match &spec.source {
            FieldSource::Constant(bytes) => {
                return spec.data_type.decode_literal(bytes).map(ResolvedField::value);
            }
            FieldSource::Header => return Err(header_error(spec)),
            FieldSource::Row => (),
        }
        if cursor.state() != CursorState::InBlock {
            return Err(Error::invalid_operation(format!(
                "field '{}' resolved while the cursor is not on a row",
                spec.name
            )));
        }

        let row = cursor.count_in_block();
        if let Some(block) = cursor.blocks().get(&spec.name) {
            let value = block.value_at(row).ok_or_else(|| {
                Error::invalid_operation(format!("row {row} is outside block '{}'", block.name))
            })?;
            return Ok(ResolvedField::value(value));
        }
        if let Some(field) = ConstantField::from_name(&spec.name) {
            return field.value(cursor, meta).map(ResolvedField::value);
        }
        if spec.name == DB_ID_FIELD {
            let id = self
                .factors
                .db_id(meta.file_number, meta.snapshot, row as i64)?;
            return Ok(ResolvedField::value(Value::Int64(id)));
        }
        if let Some(field) = NullField::from_name(&spec.name) {
            return Ok(ResolvedField::null(field.zero()));
        }
        Err(Error::unmapped_field(&spec.name))
    }
}

fn header_error(spec: &FieldSpec) -> Error {
    Error::invalid_operation(format!("header field '{}' is not row data", spec.name))
}

#[cfg(test)]
mod tests {
    use sag_common::error::ErrorKind;
    use sag_container::{MemoryArray, MemoryContainer, TypedBuffer};

    use super::{ConstantField, FieldResolver, IdFactors, NullField, Resolution, is_reserved};
    use crate::{
        block::ColumnBlockReader,
        cursor::RowCursor,
        meta::FileMeta,
        schema::FieldSpec,
        value::{DataType, ResolvedField, Value},
    };

    fn meta() -> FileMeta {
        FileMeta {
            file_number: 2,
            snapshot: 63,
            redshift: 0.25,
        }
    }

    fn container() -> MemoryContainer {
        let mut container = MemoryContainer::new("resolve");
        container
            .add_array(
                "/Galaxies/Zero",
                MemoryArray::new(TypedBuffer::Int64(vec![0; 8])),
            )
            .unwrap();
        container
            .add_array(
                "/Galaxies/Mass",
                MemoryArray::new(TypedBuffer::Float64((0..8).map(f64::from).collect())),
            )
            .unwrap();
        container
    }

    fn cursor_at(container: &MemoryContainer, rows: usize) -> RowCursor {
        let reader = ColumnBlockReader::new(vec![
            "/Galaxies/Zero".to_string(),
            "/Galaxies/Mass".to_string(),
        ]);
        let mut cursor = RowCursor::new(reader, 6).unwrap();
        for _ in 0..rows {
            assert!(cursor.advance(container).unwrap());
        }
        cursor
    }

    #[test]
    fn test_db_id() {
        assert_eq!(IdFactors::default().db_id(2, 63, 5).unwrap(), 2063000005);
        assert_eq!(IdFactors::new(10, 100).db_id(1, 2, 3).unwrap(), 1203);
        assert!(IdFactors::new(i64::MAX, 2).db_id(2, 0, 0).is_err());
    }

    #[test]
    fn test_resolve_order() {
        let container = container();
        let cursor = cursor_at(&container, 6);
        let resolver = FieldResolver::default();
        let meta = meta();
        let resolve = |name: &str, data_type| {
            resolver
                .resolve(&FieldSpec::row(name, data_type), &cursor, &meta)
                .unwrap()
        };

        assert_eq!(
            resolve("Galaxies/Mass", DataType::Real8),
            ResolvedField::value(Value::Float64(5.0))
        );
        assert_eq!(
            resolve("snapnum", DataType::Int4),
            ResolvedField::value(Value::Int32(63))
        );
        assert_eq!(
            resolve("redshift", DataType::Real4),
            ResolvedField::value(Value::Float32(0.25))
        );
        assert_eq!(
            resolve("fileNum", DataType::Int4),
            ResolvedField::value(Value::Int32(2))
        );
        assert_eq!(
            resolve("NInFile", DataType::Int8),
            ResolvedField::value(Value::Int64(6))
        );
        assert_eq!(
            resolve("dbId", DataType::Int8),
            ResolvedField::value(Value::Int64(2063000005))
        );
    }

    #[test]
    fn test_null_placeholders() {
        let container = container();
        let cursor = cursor_at(&container, 1);
        let resolver = FieldResolver::default();
        let real_zero = resolver
            .resolve(&FieldSpec::row("/Galaxies/Zero", DataType::Int8), &cursor, &meta())
            .unwrap();
        let phkey = resolver
            .resolve(&FieldSpec::row("phkey", DataType::Int8), &cursor, &meta())
            .unwrap();
        let ix = resolver
            .resolve(&FieldSpec::row("ix", DataType::Int4), &cursor, &meta())
            .unwrap();

        assert!(!real_zero.is_null);
        assert!(phkey.is_null);
        assert_eq!(real_zero.value, phkey.value);
        assert_ne!(real_zero, phkey);
        assert_eq!(ix, ResolvedField::null(Value::Int32(0)));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let container = container();
        let cursor = cursor_at(&container, 3);
        let resolver = FieldResolver::default();
        for name in ["/Galaxies/Mass", "dbId", "NInFile", "forestId"] {
            let spec = FieldSpec::row(name, DataType::Int8);
            let first = resolver.resolve(&spec, &cursor, &meta()).unwrap();
            let second = resolver.resolve(&spec, &cursor, &meta()).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_resolve_failures() {
        let container = container();
        let resolver = FieldResolver::default();

        let cursor = cursor_at(&container, 0);
        let err = resolver
            .resolve(&FieldSpec::row("dbId", DataType::Int8), &cursor, &meta())
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidOperation { .. }));

        let cursor = cursor_at(&container, 1);
        let err = resolver
            .resolve(&FieldSpec::row("halo_mass", DataType::Real4), &cursor, &meta())
            .unwrap_err();
        match err.kind() {
            ErrorKind::UnmappedField { field } => assert_eq!(field, "halo_mass"),
            other => panic!("unexpected error: {other}"),
        }

        let err = resolver
            .resolve(&FieldSpec::header("Snapshot", DataType::Int4), &cursor, &meta())
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidOperation { .. }));
    }

    #[test]
    fn test_constant_spec_bypasses_resolution() {
        let container = container();
        let cursor = cursor_at(&container, 0);
        let spec = FieldSpec::constant("anything", DataType::Int2, 7i16.to_le_bytes().to_vec());
        assert_eq!(
            FieldResolver::default()
                .resolve(&spec, &cursor, &meta())
                .unwrap(),
            ResolvedField::value(Value::Int16(7))
        );
    }

    #[test]
    fn test_classify_and_validate() {
        let resolver = FieldResolver::default();
        let columns = vec!["/Galaxies/Mass".to_string(), "/snapnum".to_string()];
        assert_eq!(
            resolver.classify("Galaxies/Mass", &columns).unwrap(),
            Resolution::Column("/Galaxies/Mass".to_string())
        );
        assert_eq!(
            resolver.classify("snapnum", &columns).unwrap(),
            Resolution::Column("/snapnum".to_string())
        );
        assert_eq!(
            resolver.classify("redshift", &columns).unwrap(),
            Resolution::Constant(ConstantField::Redshift)
        );
        assert_eq!(
            resolver.classify("dbId", &columns).unwrap(),
            Resolution::ComputedId
        );
        assert_eq!(
            resolver.classify("depthFirstId", &columns).unwrap(),
            Resolution::Null(NullField::DepthFirstId)
        );
        assert!(resolver.classify("DBID", &columns).is_err());

        let specs = [
            FieldSpec::row("dbId", DataType::Int8),
            FieldSpec::constant("c", DataType::Bit, vec![1]),
            FieldSpec::row("bogus", DataType::Int8),
        ];
        let err = resolver.validate(&specs, &columns).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnmappedField { .. }));
        assert!(resolver.validate(&specs[..2], &columns).is_ok());

        assert!(is_reserved("iz"));
        assert!(!is_reserved("Galaxies/Mass"));
    }
}
