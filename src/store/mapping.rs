//! How a store's child positions map onto rows and cells.
//!
//! The engine performs every mutation the same way; the mapping decides which
//! notifications describe it. Lists and trees expose one row per child,
//! tables wrap the flat sequence into a fixed-width grid.

use crate::domain::position::div_ceil;
use crate::domain::NodeId;
use crate::store::notify::Change;

/// Notifications describing one mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Announcement {
    /// Bracket opened before and closed after the mutation
    pub bracket: Option<Change>,
    /// Emitted after the bracket has closed
    pub follow_up: Vec<Change>,
}

/// One node leaving `src_row` under `src_parent` for `dst_parent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub src_parent: Option<NodeId>,
    pub src_row: usize,
    pub dst_parent: Option<NodeId>,
    /// Destination row counted before the move
    pub dst_row: usize,
    /// Destination row once the move is done
    pub final_row: usize,
}

pub trait RowMapping {
    /// `(row, column)` of the child at `pos`.
    fn cell(&self, pos: usize) -> (usize, usize);

    /// `count` children spliced in at `first`; `len` is the length before.
    fn on_insert(&self, parent: Option<NodeId>, first: usize, count: usize, len: usize)
        -> Announcement;

    /// `count` children removed from `first`; `len` is the length before.
    fn on_remove(&self, parent: Option<NodeId>, first: usize, count: usize, len: usize)
        -> Announcement;

    fn on_move(&self, relocation: &Relocation) -> Announcement;
}

/// One row per child, single cell per row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rows;

impl RowMapping for Rows {
    fn cell(&self, pos: usize) -> (usize, usize) {
        (pos, 0)
    }

    fn on_insert(
        &self,
        parent: Option<NodeId>,
        first: usize,
        count: usize,
        _len: usize,
    ) -> Announcement {
        Announcement {
            bracket: Some(Change::InsertBegin {
                parent,
                first,
                last: first + count - 1,
            }),
            follow_up: Vec::new(),
        }
    }

    fn on_remove(
        &self,
        parent: Option<NodeId>,
        first: usize,
        count: usize,
        _len: usize,
    ) -> Announcement {
        Announcement {
            bracket: Some(Change::RemoveBegin {
                parent,
                first,
                last: first + count - 1,
            }),
            follow_up: Vec::new(),
        }
    }

    fn on_move(&self, relocation: &Relocation) -> Announcement {
        Announcement {
            bracket: Some(Change::MoveBegin {
                src_parent: relocation.src_parent,
                first: relocation.src_row,
                last: relocation.src_row,
                dst_parent: relocation.dst_parent,
                dst_row: relocation.dst_row,
            }),
            follow_up: Vec::new(),
        }
    }
}

/// Flat sequence wrapped into rows of `columns` cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    columns: usize,
}

impl Grid {
    /// Grid of at least one column.
    pub fn new(columns: usize) -> Self {
        Self {
            columns: columns.max(1),
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn set_columns(&mut self, columns: usize) {
        self.columns = columns.max(1);
    }

    pub fn row_count(&self, len: usize) -> usize {
        div_ceil(len, self.columns)
    }

    /// Flat position of `(row, column)`, without bound checks.
    pub fn position(&self, row: usize, column: usize) -> usize {
        row * self.columns + column
    }

    fn changed(&self, first: usize, last: usize) -> Change {
        Change::DataChanged {
            parent: None,
            top_left: self.cell(first),
            bottom_right: self.cell(last),
        }
    }
}

impl RowMapping for Grid {
    fn cell(&self, pos: usize) -> (usize, usize) {
        (pos / self.columns, pos % self.columns)
    }

    fn on_insert(
        &self,
        parent: Option<NodeId>,
        first: usize,
        count: usize,
        len: usize,
    ) -> Announcement {
        let rows_before = self.row_count(len);
        let rows_after = self.row_count(len + count);

        // New rows only when the last row was full; otherwise the cells fill it
        let bracket = (rows_after > rows_before).then(|| Change::InsertBegin {
            parent,
            first: rows_before,
            last: rows_after - 1,
        });

        // Cells of already existing rows that now show other nodes
        let upper = (len + count).min(rows_before * self.columns);
        let follow_up = if upper > first {
            vec![self.changed(first, upper - 1)]
        } else {
            Vec::new()
        };

        Announcement { bracket, follow_up }
    }

    fn on_remove(
        &self,
        parent: Option<NodeId>,
        first: usize,
        count: usize,
        len: usize,
    ) -> Announcement {
        let new_len = len - count;
        let rows_before = self.row_count(len);
        let rows_after = self.row_count(new_len);

        let bracket = (rows_after < rows_before).then(|| Change::RemoveBegin {
            parent,
            first: rows_after,
            last: rows_before - 1,
        });
        let follow_up = if new_len > first {
            vec![self.changed(first, new_len - 1)]
        } else {
            Vec::new()
        };

        Announcement { bracket, follow_up }
    }

    fn on_move(&self, relocation: &Relocation) -> Announcement {
        let low = relocation.src_row.min(relocation.final_row);
        let high = relocation.src_row.max(relocation.final_row);
        Announcement {
            bracket: None,
            follow_up: vec![self.changed(low, high)],
        }
    }
}
