//! Row cursor driving block reads.

use sag_common::{Result, verify_arg};
use sag_container::ArrayContainer;

use crate::block::{BlockSet, ColumnBlockReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// No block is loaded; the next advance reads at `curr_row`.
    Empty,
    /// Positioned on row `count_in_block` of the loaded block.
    InBlock,
    /// A block read returned no rows.
    EndOfData,
}

/// Tracks the position within the data and owns the current block generation.
///
/// `curr_row` counts the rows consumed so far, so the index of the row under
/// the cursor is `curr_row - 1`.
#[derive(Debug, Clone)]
pub struct RowCursor {
    reader: ColumnBlockReader,
    block_rows: usize,
    blocks: BlockSet,
    state: CursorState,
    curr_row: u64,
    count_in_block: usize,
}

impl RowCursor {
    /// Creates a cursor reading `block_rows` rows at a time.
    pub fn new(reader: ColumnBlockReader, block_rows: usize) -> Result<RowCursor> {
        verify_arg!(block_rows, block_rows >= 1);
        Ok(RowCursor {
            reader,
            block_rows,
            blocks: BlockSet::default(),
            state: CursorState::Empty,
            curr_row: 0,
            count_in_block: 0,
        })
    }

    /// Moves to the next row, reading a new block when needed.
    ///
    /// Returns `false` at the end of the data. A failed block read leaves the
    /// cursor where it was.
    pub fn advance(&mut self, container: &dyn ArrayContainer) -> Result<bool> {
        match self.state {
            CursorState::EndOfData => return Ok(false),
            CursorState::InBlock if self.count_in_block + 1 < self.blocks.len() => {
                self.count_in_block += 1;
            }
            CursorState::Empty | CursorState::InBlock => {
                let blocks = self
                    .reader
                    .read_block(container, self.curr_row, self.block_rows)?;
                self.count_in_block = 0;
                if blocks.is_empty() {
                    self.blocks = blocks;
                    self.state = CursorState::EndOfData;
                    return Ok(false);
                }
                self.blocks = blocks;
                self.state = CursorState::InBlock;
            }
        }
        self.curr_row += 1;
        Ok(true)
    }

    /// Repositions the cursor so that the next advance loads row `row`.
    pub fn set_row(&mut self, row: u64) {
        self.curr_row = row;
        self.count_in_block = 0;
        self.blocks = BlockSet::default();
        self.state = CursorState::Empty;
    }

    pub fn curr_row(&self) -> u64 {
        self.curr_row
    }

    pub fn count_in_block(&self) -> usize {
        self.count_in_block
    }

    /// Number of rows in the loaded block.
    pub fn block_size(&self) -> usize {
        self.blocks.len()
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn blocks(&self) -> &BlockSet {
        &self.blocks
    }

    /// Index of the row under the cursor, if positioned on one.
    pub fn row_index(&self) -> Option<u64> {
        match self.state {
            CursorState::InBlock => Some(self.blocks.offset() + self.count_in_block as u64),
            CursorState::Empty | CursorState::EndOfData => None,
        }
    }

    pub fn reader(&self) -> &ColumnBlockReader {
        &self.reader
    }

    pub fn reader_mut(&mut self) -> &mut ColumnBlockReader {
        &mut self.reader
    }
}

#[cfg(test)]
mod tests {
    use sag_common::error::ErrorKind;
    use sag_container::{MemoryArray, MemoryContainer, TypedBuffer};

    use super::{CursorState, RowCursor};
    use crate::{block::ColumnBlockReader, value::Value};

    fn container(rows: i64) -> MemoryContainer {
        let mut container = MemoryContainer::new("cursor");
        container
            .add_array(
                "/Id",
                MemoryArray::new(TypedBuffer::Int64((0..rows).collect())),
            )
            .unwrap();
        container
    }

    fn cursor(block_rows: usize) -> RowCursor {
        RowCursor::new(ColumnBlockReader::new(vec!["/Id".to_string()]), block_rows).unwrap()
    }

    #[test]
    fn test_ten_rows_in_blocks_of_six() {
        let container = container(10);
        let mut cursor = cursor(6);
        assert_eq!(cursor.state(), CursorState::Empty);

        let mut block_sizes = Vec::new();
        let mut ids = Vec::new();
        while cursor.advance(&container).unwrap() {
            if cursor.count_in_block() == 0 {
                block_sizes.push(cursor.block_size());
            }
            assert_eq!(cursor.row_index(), Some(cursor.curr_row() - 1));
            ids.push(cursor.blocks().get("/Id").unwrap().value_at(cursor.count_in_block()));
        }
        assert_eq!(block_sizes, [6, 4]);
        assert_eq!(cursor.curr_row(), 10);
        assert_eq!(cursor.state(), CursorState::EndOfData);
        assert_eq!(cursor.block_size(), 0);
        assert_eq!(ids, (0..10).map(|i| Some(Value::Int64(i))).collect::<Vec<_>>());

        assert!(!cursor.advance(&container).unwrap());
        assert_eq!(cursor.curr_row(), 10);
    }

    #[test]
    fn test_block_sizes_sum_to_row_count() {
        for rows in [0i64, 1, 5, 6, 7, 12, 13, 100] {
            let container = container(rows);
            for block_rows in [1usize, 2, 3, 6, 7, 64, 1000] {
                let mut cursor = cursor(block_rows);
                let mut visited = 0;
                let mut block_sizes = Vec::new();
                while cursor.advance(&container).unwrap() {
                    visited += 1;
                    if cursor.count_in_block() == 0 {
                        block_sizes.push(cursor.block_size());
                    }
                }
                assert_eq!(visited, rows, "rows={rows} block_rows={block_rows}");
                assert_eq!(block_sizes.iter().sum::<usize>(), rows as usize);
                if let Some((last, full)) = block_sizes.split_last() {
                    assert!(full.iter().all(|&size| size == block_rows));
                    let rem = rows as usize % block_rows;
                    assert_eq!(*last, if rem == 0 { block_rows } else { rem });
                }
            }
        }
    }

    #[test]
    fn test_set_row() {
        let container = container(10);
        let mut cursor = cursor(4);
        assert!(cursor.advance(&container).unwrap());
        assert!(cursor.advance(&container).unwrap());

        cursor.set_row(7);
        assert_eq!(cursor.state(), CursorState::Empty);
        assert!(cursor.blocks().is_empty());
        assert!(cursor.advance(&container).unwrap());
        assert_eq!(cursor.row_index(), Some(7));
        assert_eq!(cursor.block_size(), 3);
        assert_eq!(
            cursor.blocks().get("/Id").unwrap().value_at(0),
            Some(Value::Int64(7))
        );
        assert_eq!(cursor.curr_row(), 8);

        cursor.set_row(10);
        assert!(!cursor.advance(&container).unwrap());
    }

    #[test]
    fn test_failed_read_leaves_cursor() {
        let mut container = container(10);
        container
            .add_array(
                "/Count",
                MemoryArray::new(TypedBuffer::Int32((0..10).collect())),
            )
            .unwrap();
        let mut cursor = RowCursor::new(
            ColumnBlockReader::new(vec!["/Id".into(), "/Count".into()]),
            6,
        )
        .unwrap();
        let err = cursor.advance(&container).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnsupportedColumnType { .. }));
        assert_eq!(cursor.state(), CursorState::Empty);
        assert_eq!(cursor.curr_row(), 0);
    }

    #[test]
    fn test_zero_block_rows() {
        let err = RowCursor::new(ColumnBlockReader::new(Vec::new()), 0).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    }
}
