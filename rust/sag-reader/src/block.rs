//! Lockstep block reads over a set of equal-length columns.

use std::time::Instant;

use ahash::AHashMap;
use sag_common::{Result, error::Error, verify_arg};
use sag_container::{ArrayContainer, ScalarKind, TypedBuffer, path};
use serde::Serialize;

use crate::value::Value;

/// Describes one column: its name, scalar kind and total number of rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ScalarKind,
    pub rows: u64,
}

/// The values of one column for the rows of a single block.
#[derive(Debug, Clone, PartialEq)]
pub struct DataBlock {
    pub name: String,
    pub values: TypedBuffer,
}

impl DataBlock {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copies out the value at `index` within the block.
    pub fn value_at(&self, index: usize) -> Option<Value> {
        match &self.values {
            TypedBuffer::Int32(v) => v.get(index).copied().map(Value::Int32),
            TypedBuffer::Int64(v) => v.get(index).copied().map(Value::Int64),
            TypedBuffer::Float32(v) => v.get(index).copied().map(Value::Float32),
            TypedBuffer::Float64(v) => v.get(index).copied().map(Value::Float64),
        }
    }
}

/// One generation of blocks, all covering the same row range.
#[derive(Debug, Clone, Default)]
pub struct BlockSet {
    offset: u64,
    len: usize,
    blocks: Vec<DataBlock>,
    index: AHashMap<String, usize>,
}

impl BlockSet {
    fn new(offset: u64, len: usize, blocks: Vec<DataBlock>) -> BlockSet {
        let index = blocks
            .iter()
            .enumerate()
            .map(|(i, block)| (block.name.clone(), i))
            .collect();
        BlockSet {
            offset,
            len,
            blocks,
            index,
        }
    }

    fn empty(offset: u64) -> BlockSet {
        BlockSet {
            offset,
            ..Default::default()
        }
    }

    /// Row index of the first row in this generation.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of rows in this generation.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the block for `name`; a missing leading `/` is tolerated.
    pub fn get(&self, name: &str) -> Option<&DataBlock> {
        self.index
            .get(path::normalize(name).as_ref())
            .map(|&i| &self.blocks[i])
    }

    pub fn blocks(&self) -> &[DataBlock] {
        &self.blocks
    }
}

/// Reads row ranges from a fixed list of columns in lockstep.
///
/// The columns are described (kind, shape, row count) on first use and the
/// description is reused for every later read.
#[derive(Debug, Clone)]
pub struct ColumnBlockReader {
    columns: Vec<String>,
    descriptors: Option<Vec<ColumnDescriptor>>,
}

impl ColumnBlockReader {
    pub fn new(columns: Vec<String>) -> ColumnBlockReader {
        ColumnBlockReader {
            columns,
            descriptors: None,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the column descriptions, computing them on first call.
    ///
    /// Fails with `UnsupportedColumnType` for a stored type without a scalar
    /// kind, `UnsupportedShape` for anything but `[n]` or `[n, 1]` and
    /// `RowCountMismatch` if the columns differ in length.
    pub fn describe(&mut self, container: &dyn ArrayContainer) -> Result<&[ColumnDescriptor]> {
        let descriptors = match self.descriptors.take() {
            Some(descriptors) => descriptors,
            None => describe_columns(container, &self.columns)?,
        };
        Ok(self.descriptors.insert(descriptors).as_slice())
    }

    /// Row count shared by all columns, zero when there are none.
    pub fn total_rows(&mut self, container: &dyn ArrayContainer) -> Result<u64> {
        Ok(self.describe(container)?.first().map_or(0, |d| d.rows))
    }

    /// Reads up to `requested` rows starting at row `offset` from every column.
    ///
    /// Returns an empty set once `offset` reaches the end of the data. Either
    /// every column is read or the call fails as a whole.
    pub fn read_block(
        &mut self,
        container: &dyn ArrayContainer,
        offset: u64,
        requested: usize,
    ) -> Result<BlockSet> {
        verify_arg!(requested, requested >= 1);
        let started = Instant::now();
        let descriptors = self.describe(container)?;
        let total_rows = descriptors.first().map_or(0, |d| d.rows);
        if offset >= total_rows {
            log::debug!("end of data at row {offset} of {total_rows}");
            return Ok(BlockSet::empty(offset));
        }
        let actual = (requested as u64).min(total_rows - offset);

        let mut blocks = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            if descriptor.kind == ScalarKind::Int32 {
                return Err(Error::unsupported_column_type(
                    &descriptor.name,
                    descriptor.kind.to_string(),
                ));
            }
            let values = read_exact(container, descriptor, offset, actual)?;
            blocks.push(DataBlock {
                name: descriptor.name.clone(),
                values,
            });
        }

        log::debug!(
            "read block of {actual} rows at offset {offset} from {} columns in {:?}",
            blocks.len(),
            started.elapsed()
        );
        Ok(BlockSet::new(offset, actual as usize, blocks))
    }
}

fn describe_columns(
    container: &dyn ArrayContainer,
    columns: &[String],
) -> Result<Vec<ColumnDescriptor>> {
    let mut descriptors = Vec::<ColumnDescriptor>::with_capacity(columns.len());
    for name in columns {
        let stored = container.stored_type(name)?;
        let kind = ScalarKind::from_stored(&stored)
            .ok_or_else(|| Error::unsupported_column_type(name, stored.to_string()))?;
        let extent = container.extent(name)?;
        let rows = extent
            .column_rows()
            .ok_or_else(|| Error::unsupported_shape(name, &extent.dims))?;
        if let Some(first) = descriptors.first() {
            if first.rows != rows {
                return Err(Error::row_count_mismatch(name, first.rows, rows));
            }
        }
        descriptors.push(ColumnDescriptor {
            name: path::normalize(name).into_owned(),
            kind,
            rows,
        });
    }
    Ok(descriptors)
}

fn read_exact(
    container: &dyn ArrayContainer,
    column: &ColumnDescriptor,
    offset: u64,
    count: u64,
) -> Result<TypedBuffer> {
    let kind = column.kind;
    let values = container.read_range(&column.name, offset, count, kind)?;
    if values.kind() != kind {
        return Err(Error::storage_access(
            &column.name,
            format!("driver returned {} values, expected {kind}", values.kind()),
        ));
    }
    if values.len() as u64 != count {
        return Err(Error::storage_access(
            &column.name,
            format!(
                "short read: {} of {count} rows at offset {offset}",
                values.len()
            ),
        ));
    }
    Ok(values)
}
