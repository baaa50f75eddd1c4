//! The catalogue reader facade.
//!
//! `SagReader` owns the open container, the metadata captured at open time,
//! the row cursor and the field resolver. A typical pass:
//!
//! ```ignore
//! let mut reader = SagReader::open(driver, path, ReaderOptions::default())?;
//! reader.validate_fields(&specs)?;
//! for row in reader.rows(&specs) {
//!     let row = row?;
//!     // ...
//! }
//! ```

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use sag_common::{Result, error::Error, try_or_ret_some_err, verify_arg};
use sag_container::{ArrayContainer, ContainerDriver, ScalarKind, path};

use crate::{
    block::{ColumnBlockReader, ColumnDescriptor},
    cursor::RowCursor,
    meta::{FileMeta, load_meta},
    resolve::{FieldResolver, IdFactors, Resolution, is_reserved},
    scan::scan,
    schema::FieldSpec,
    value::ResolvedField,
};

/// Construction parameters of a `SagReader`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderOptions {
    /// Index of the file within its snapshot, folded into `dbId`.
    pub file_number: i32,
    /// Rows read per block.
    pub block_size: usize,
    pub id_factors: IdFactors,
    /// Group whose attributes and arrays are read.
    pub root: String,
    /// When set, only scanned columns named here are read.
    pub field_names: Option<Vec<String>>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            file_number: 0,
            block_size: 6,
            id_factors: IdFactors::default(),
            root: path::ROOT.to_string(),
            field_names: None,
        }
    }
}

impl ReaderOptions {
    pub fn with_file_number(self, file_number: i32) -> Self {
        Self {
            file_number,
            ..self
        }
    }

    /// Sets the number of rows read per block. Must be at least 1.
    pub fn with_block_size(self, block_size: usize) -> Self {
        Self { block_size, ..self }
    }

    pub fn with_id_factors(self, id_factors: IdFactors) -> Self {
        Self { id_factors, ..self }
    }

    pub fn with_root(self, root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            ..self
        }
    }

    /// Restricts the columns read to those named by the field list.
    pub fn with_field_names<I, S>(self, field_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field_names: Some(field_names.into_iter().map(Into::into).collect()),
            ..self
        }
    }
}

struct OpenFile {
    path: PathBuf,
    container: Box<dyn ArrayContainer>,
    meta: FileMeta,
    columns: Vec<String>,
    cursor: RowCursor,
}

/// Reads the rows of one catalogue file at a time.
pub struct SagReader {
    driver: Arc<dyn ContainerDriver>,
    options: ReaderOptions,
    resolver: FieldResolver,
    file: Option<OpenFile>,
}

impl SagReader {
    /// Creates a reader without opening a file.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the block size is zero.
    pub fn new(driver: Arc<dyn ContainerDriver>, options: ReaderOptions) -> Result<SagReader> {
        verify_arg!(block_size, options.block_size >= 1);
        Ok(SagReader {
            driver,
            resolver: FieldResolver::new(options.id_factors),
            options,
            file: None,
        })
    }

    /// Creates a reader and opens `path`.
    pub fn open(
        driver: Arc<dyn ContainerDriver>,
        path: impl AsRef<Path>,
        options: ReaderOptions,
    ) -> Result<SagReader> {
        let mut reader = SagReader::new(driver, options)?;
        reader.open_file(path)?;
        Ok(reader)
    }

    /// Opens `path`, closing the current file first.
    ///
    /// Loads the file metadata, scans the column names, selects the active
    /// columns and positions the cursor before the first row.
    ///
    /// # Errors
    /// Fails with `StorageAccess` or `MissingAttribute` on an unreadable file,
    /// and with `UnmappedField` if a configured field name is neither a column
    /// nor a reserved name.
    pub fn open_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.close_file();

        let path = path.as_ref();
        let root = self.options.root.as_str();
        let container = self.driver.open_read_only(path)?;
        let meta = FileMeta::new(
            self.options.file_number,
            load_meta(container.as_ref(), root)?,
        );
        let columns = scan(container.as_ref(), root)?;
        let mut active = select_columns(&columns, self.options.field_names.as_deref())?;
        if active.is_empty() {
            // Rows are still counted from a stored column when only reserved
            // names are selected.
            if let Some(column) = first_readable_column(container.as_ref(), &columns) {
                log::debug!("no selected columns, counting rows from {column}");
                active.push(column.clone());
            }
        }
        let cursor = RowCursor::new(ColumnBlockReader::new(active), self.options.block_size)?;

        log::info!(
            "opened {} (snapshot {}, redshift {}, {} columns, {} active)",
            path.display(),
            meta.snapshot,
            meta.redshift,
            columns.len(),
            cursor.reader().columns().len()
        );
        self.file = Some(OpenFile {
            path: path.to_path_buf(),
            container,
            meta,
            columns,
            cursor,
        });
        Ok(())
    }

    /// Closes the current file, if any.
    pub fn close_file(&mut self) {
        if let Some(file) = self.file.take() {
            log::info!(
                "closed {} after {} rows",
                file.path.display(),
                file.cursor.curr_row()
            );
        }
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(|file| file.path.as_path())
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Moves to the next row. Returns `false` at the end of the data.
    pub fn next_row(&mut self) -> Result<bool> {
        let file = self.file_mut()?;
        file.cursor.advance(file.container.as_ref())
    }

    /// Repositions so that the next `next_row` lands on row `row`.
    pub fn set_curr_row(&mut self, row: u64) -> Result<()> {
        self.file_mut()?.cursor.set_row(row);
        Ok(())
    }

    /// Number of rows consumed so far in the open file.
    pub fn curr_row(&self) -> u64 {
        self.file.as_ref().map_or(0, |file| file.cursor.curr_row())
    }

    pub fn cursor(&self) -> Option<&RowCursor> {
        self.file.as_ref().map(|file| &file.cursor)
    }

    /// All array names found under the root, in scan order.
    pub fn column_names(&self) -> &[String] {
        self.file
            .as_ref()
            .map(|file| file.columns.as_slice())
            .unwrap_or_default()
    }

    /// The columns read block by block.
    pub fn active_columns(&self) -> &[String] {
        self.file
            .as_ref()
            .map(|file| file.cursor.reader().columns())
            .unwrap_or_default()
    }

    pub fn meta(&self) -> Option<&FileMeta> {
        self.file.as_ref().map(|file| &file.meta)
    }

    pub fn container(&self) -> Option<&dyn ArrayContainer> {
        self.file.as_ref().map(|file| file.container.as_ref())
    }

    /// Number of rows shared by the active columns.
    pub fn num_rows(&mut self) -> Result<u64> {
        let file = self.file_mut()?;
        file.cursor
            .reader_mut()
            .total_rows(file.container.as_ref())
    }

    pub fn column_descriptors(&mut self) -> Result<Vec<ColumnDescriptor>> {
        let file = self.file_mut()?;
        Ok(file
            .cursor
            .reader_mut()
            .describe(file.container.as_ref())?
            .to_vec())
    }

    /// Returns the value of `spec` at the current row.
    pub fn get_item_in_row(&self, spec: &FieldSpec) -> Result<ResolvedField> {
        let file = self.file()?;
        self.resolver.resolve(spec, &file.cursor, &file.meta)
    }

    /// Classifies a row field name against the active columns.
    pub fn classify(&self, name: &str) -> Result<Resolution> {
        self.resolver.classify(name, self.active_columns())
    }

    /// Checks that every spec can be resolved, without reading rows.
    pub fn validate_fields(&self, specs: &[FieldSpec]) -> Result<()> {
        self.file()?;
        self.resolver.validate(specs, self.active_columns())
    }

    /// Iterates over the remaining rows, resolving `specs` for each.
    ///
    /// Iteration stops at the end of the data or after the first error.
    pub fn rows<'a>(&'a mut self, specs: &'a [FieldSpec]) -> Rows<'a> {
        Rows {
            reader: self,
            specs,
            done: false,
        }
    }

    fn file(&self) -> Result<&OpenFile> {
        self.file
            .as_ref()
            .ok_or_else(|| Error::invalid_operation("no file is open"))
    }

    fn file_mut(&mut self) -> Result<&mut OpenFile> {
        self.file
            .as_mut()
            .ok_or_else(|| Error::invalid_operation("no file is open"))
    }
}

/// Keeps the scanned columns named by `field_names`, in scan order.
fn select_columns(columns: &[String], field_names: Option<&[String]>) -> Result<Vec<String>> {
    let Some(field_names) = field_names else {
        return Ok(columns.to_vec());
    };
    let mut wanted = Vec::with_capacity(field_names.len());
    for name in field_names {
        let normalized = path::normalize(name);
        if columns.iter().any(|c| *c == normalized) {
            wanted.push(normalized.into_owned());
        } else if !is_reserved(name) {
            return Err(Error::unmapped_field(name));
        }
    }
    Ok(columns
        .iter()
        .filter(|c| wanted.contains(c))
        .cloned()
        .collect())
}

/// First column of a readable scalar kind and column shape.
fn first_readable_column<'a>(
    container: &dyn ArrayContainer,
    columns: &'a [String],
) -> Option<&'a String> {
    columns.iter().find(|name| {
        let kind = container
            .stored_type(name)
            .ok()
            .and_then(|stored| ScalarKind::from_stored(&stored));
        let rows = container
            .extent(name)
            .ok()
            .and_then(|extent| extent.column_rows());
        matches!(kind, Some(kind) if kind != ScalarKind::Int32) && rows.is_some()
    })
}

/// Iterator over resolved rows, see `SagReader::rows`.
pub struct Rows<'a> {
    reader: &'a mut SagReader,
    specs: &'a [FieldSpec],
    done: bool,
}

impl Iterator for Rows<'_> {
    type Item = Result<Vec<ResolvedField>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        self.done = true;
        if !try_or_ret_some_err!(self.reader.next_row()) {
            return None;
        }
        let row = try_or_ret_some_err!(
            self.specs
                .iter()
                .map(|spec| self.reader.get_item_in_row(spec))
                .collect::<Result<Vec<_>>>()
        );
        self.done = false;
        Some(Ok(row))
    }
}

#[cfg(test)]
mod tests {
    use super::{ReaderOptions, select_columns};

    #[test]
    fn test_options_builders() {
        let options = ReaderOptions::default()
            .with_block_size(100)
            .with_file_number(3)
            .with_root("/Galaxies")
            .with_field_names(["dbId"]);
        assert_eq!(options.block_size, 100);
        assert_eq!(options.file_number, 3);
        assert_eq!(options.root, "/Galaxies");
        assert_eq!(options.field_names, Some(vec!["dbId".to_string()]));
        assert_eq!(ReaderOptions::default().block_size, 6);
    }

    #[test]
    fn test_select_columns() {
        let columns = vec!["/A".to_string(), "/B".to_string(), "/C".to_string()];
        assert_eq!(select_columns(&columns, None).unwrap(), columns);

        let names = vec!["C".to_string(), "dbId".to_string(), "/A".to_string()];
        assert_eq!(
            select_columns(&columns, Some(&names)).unwrap(),
            ["/A".to_string(), "/C".to_string()]
        );

        let names = vec!["/D".to_string()];
        assert!(select_columns(&columns, Some(&names)).is_err());
    }
}
