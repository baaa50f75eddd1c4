//! Field specifications and the logical schema built from a mapping file.

use std::{fmt, str::FromStr};

use sag_common::{Result, error::Error, verify_arg};
use serde::Serialize;

use crate::{mapping::FieldMapping, value::DataType};

/// Where the value of a field comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    /// Resolved against the row under the cursor.
    Row,
    /// A literal supplied by the caller, little-endian encoded.
    Constant(Vec<u8>),
    /// Part of a file header; never read as row data.
    Header,
}

/// Binds a data-object name to its source type and source kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub data_type: DataType,
    pub source: FieldSource,
}

impl FieldSpec {
    pub fn row(name: impl Into<String>, data_type: DataType) -> FieldSpec {
        FieldSpec {
            name: name.into(),
            data_type,
            source: FieldSource::Row,
        }
    }

    pub fn constant(name: impl Into<String>, data_type: DataType, bytes: Vec<u8>) -> FieldSpec {
        FieldSpec {
            name: name.into(),
            data_type,
            source: FieldSource::Constant(bytes),
        }
    }

    pub fn header(name: impl Into<String>, data_type: DataType) -> FieldSpec {
        FieldSpec {
            name: name.into(),
            data_type,
            source: FieldSource::Header,
        }
    }
}

/// Destination column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DbType {
    Char,
    Bit,
    BigInt,
    MediumInt,
    Integer,
    SmallInt,
    TinyInt,
    Float,
    Real,
    Date,
    Time,
    Any,
    UBigInt,
    UMediumInt,
    UInteger,
    USmallInt,
    UTinyInt,
    UFloat,
    UReal,
}

impl DbType {
    pub fn name(&self) -> &'static str {
        match self {
            DbType::Char => "CHAR",
            DbType::Bit => "BIT",
            DbType::BigInt => "BIGINT",
            DbType::MediumInt => "MEDIUMINT",
            DbType::Integer => "INTEGER",
            DbType::SmallInt => "SMALLINT",
            DbType::TinyInt => "TINYINT",
            DbType::Float => "FLOAT",
            DbType::Real => "REAL",
            DbType::Date => "DATE",
            DbType::Time => "TIME",
            DbType::Any => "ANY",
            DbType::UBigInt => "UBIGINT",
            DbType::UMediumInt => "UMEDIUMINT",
            DbType::UInteger => "UINTEGER",
            DbType::USmallInt => "USMALLINT",
            DbType::UTinyInt => "UTINYINT",
            DbType::UFloat => "UFLOAT",
            DbType::UReal => "UREAL",
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DbType {
    type Err = Error;

    fn from_str(s: &str) -> Result<DbType> {
        let db_type = match s.to_ascii_uppercase().as_str() {
            "CHAR" => DbType::Char,
            "BIT" => DbType::Bit,
            "BIGINT" => DbType::BigInt,
            "MEDIUMINT" => DbType::MediumInt,
            "INTEGER" => DbType::Integer,
            "SMALLINT" => DbType::SmallInt,
            "TINYINT" => DbType::TinyInt,
            "FLOAT" => DbType::Float,
            "REAL" | "DOUBLE" => DbType::Real,
            "DATE" => DbType::Date,
            "TIME" => DbType::Time,
            "ANY" => DbType::Any,
            "UBIGINT" => DbType::UBigInt,
            "UMEDIUMINT" => DbType::UMediumInt,
            "UINTEGER" => DbType::UInteger,
            "USMALLINT" => DbType::USmallInt,
            "UTINYINT" => DbType::UTinyInt,
            "UFLOAT" => DbType::UFloat,
            "UREAL" => DbType::UReal,
            _ => {
                return Err(Error::invalid_format(
                    "db type",
                    format!("unknown database type '{s}'"),
                ));
            }
        };
        Ok(db_type)
    }
}

/// One destination column and the field that feeds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaItem {
    pub column_name: String,
    pub db_type: DbType,
    pub spec: FieldSpec,
}

/// Ordered destination columns of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub db_name: String,
    pub table_name: String,
    pub items: Vec<SchemaItem>,
}

impl Schema {
    /// Field specs in column order.
    pub fn specs(&self) -> Vec<FieldSpec> {
        self.items.iter().map(|item| item.spec.clone()).collect()
    }

    /// Source field names in column order.
    pub fn field_names(&self) -> Vec<String> {
        self.items.iter().map(|item| item.spec.name.clone()).collect()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.column_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Builds a schema with one row-sourced item per mapping, in order.
pub fn generate_schema(
    mappings: &[FieldMapping],
    db_name: impl Into<String>,
    table_name: impl Into<String>,
) -> Result<Schema> {
    let table_name = table_name.into();
    verify_arg!(table_name, !table_name.is_empty());
    let items = mappings
        .iter()
        .map(|mapping| SchemaItem {
            column_name: mapping.column_name.clone(),
            db_type: mapping.db_type,
            spec: FieldSpec::row(&mapping.source_name, mapping.source_type),
        })
        .collect();
    Ok(Schema {
        db_name: db_name.into(),
        table_name,
        items,
    })
}
