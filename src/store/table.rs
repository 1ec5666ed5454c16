use tracing::{debug, instrument};

use crate::domain::position;
use crate::domain::{ModelIndex, Node, NodeId, StoreResult};
use crate::store::engine::Core;
use crate::store::mapping::{Announcement, Grid, RowMapping};
use crate::store::model::{Headers, ItemModel};
use crate::store::notify::{Change, StoreObserver, SubscriptionId};

/// Flat ordered sequence presented as a grid of `columns` cells per row.
///
/// The last row may be partially filled. Cell `(row, column)` holds the node
/// at flat position `row * columns + column`.
#[derive(Debug)]
pub struct TableStore<T> {
    core: Core<T, Grid>,
    headers: Headers,
}

/// Widest grid a table accepts.
pub const MAX_COLUMNS: usize = 1 << 16;

impl<T> TableStore<T> {
    /// Table of `columns` columns, clamped to `1..=MAX_COLUMNS`.
    pub fn new(columns: usize) -> Self {
        Self {
            core: Core::new(Grid::new(columns.clamp(1, MAX_COLUMNS))),
            headers: Headers::default(),
        }
    }

    /// Table with one column per header name.
    pub fn with_headers<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        let headers = Headers::new(names);
        Self {
            core: Core::new(Grid::new(headers.len().clamp(1, MAX_COLUMNS))),
            headers,
        }
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn set_headers(&mut self, headers: Headers) {
        self.headers = headers;
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.core.arena().child_count(None).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn columns(&self) -> usize {
        self.core.mapping().columns()
    }

    pub fn rows(&self) -> usize {
        self.core.mapping().row_count(self.len())
    }

    pub fn subscribe(&mut self, observer: impl StoreObserver + 'static) -> SubscriptionId {
        self.core.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.core.unsubscribe(id)
    }

    /// Inserts `node` at flat signed position `pos`.
    ///
    /// Filling a partial last row only reports the shifted cells; a row
    /// insert is announced only when the node opens a new row.
    #[instrument(level = "debug", skip(self, node), fields(name = %node.name))]
    pub fn insert(&mut self, node: Node<T>, pos: isize) -> Option<NodeId> {
        self.core
            .insert(None, pos, vec![node])
            .ok()
            .flatten()
            .and_then(|ids| ids.into_iter().next())
    }

    /// Inserts a batch: tops off the partial last row cell by cell, then
    /// inserts the remainder as whole rows under one bracket.
    #[instrument(level = "debug", skip(self, nodes), fields(count = nodes.len()))]
    pub fn insert_many(&mut self, nodes: Vec<Node<T>>, pos: isize) -> Option<Vec<NodeId>> {
        let len = self.len();
        let mut at = position::checked(pos, len)?;
        let columns = self.columns();

        let mut rest = nodes.into_iter();
        let mut ids = Vec::new();
        let open_cells = (columns - len % columns) % columns;
        for node in rest.by_ref().take(open_cells) {
            ids.extend(self.insert(node, at as isize));
            at += 1;
        }

        let rest: Vec<Node<T>> = rest.collect();
        if !rest.is_empty() {
            ids.extend(self.core.insert(None, at as isize, rest).ok().flatten()?);
        }
        Some(ids)
    }

    pub fn delete(&mut self, id: NodeId) -> StoreResult<Node<T>> {
        self.core.remove(id)
    }

    pub fn delete_many(&mut self, ids: &[NodeId]) -> StoreResult<Vec<Node<T>>> {
        self.core.remove_many(ids)
    }

    /// Moves a member to flat position `pos`; the grid keeps its shape and
    /// only the spanned cells are reported.
    pub fn move_node(&mut self, id: NodeId, pos: isize) -> StoreResult<bool> {
        self.core.move_many(&[id], None, pos)
    }

    pub fn move_many(&mut self, ids: &[NodeId], pos: isize) -> StoreResult<bool> {
        self.core.move_many(ids, None, pos)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn clear(&mut self) {
        self.core.reset();
    }

    /// Inserts one row of nodes before `row`.
    ///
    /// A row inside the table takes exactly `columns` nodes; appending after
    /// a full last row also accepts a shorter, partial row.
    pub fn insert_row(&mut self, row: usize, nodes: Vec<Node<T>>) -> Option<Vec<NodeId>> {
        self.insert_rows(row, 1, nodes)
    }

    /// Inserts `count` rows of nodes before `row`.
    pub fn insert_rows(
        &mut self,
        row: usize,
        count: usize,
        nodes: Vec<Node<T>>,
    ) -> Option<Vec<NodeId>> {
        let len = self.len();
        let columns = self.columns();
        let rows = self.rows();
        let partial = len % columns != 0;
        if count == 0 || row > rows || (row == rows && partial) {
            debug!("insert_rows rejected: row {} count {} rows {}", row, count, rows);
            return None;
        }

        let appending = row == rows;
        let capacity = count.checked_mul(columns).unwrap_or(usize::MAX);
        let fits = if appending {
            nodes.len() > capacity - columns && nodes.len() <= capacity
        } else {
            nodes.len() == capacity
        };
        if !fits {
            debug!(
                "insert_rows rejected: {} node(s) do not fill {} row(s) of {}",
                nodes.len(),
                count,
                columns
            );
            return None;
        }

        let announcement = Announcement {
            bracket: Some(Change::InsertBegin {
                parent: None,
                first: row,
                last: row + count - 1,
            }),
            follow_up: Vec::new(),
        };
        let at = self.core.mapping().position(row, 0);
        Some(self.core.attach(None, at, nodes, announcement))
    }

    pub fn remove_row(&mut self, row: usize) -> Option<Vec<Node<T>>> {
        self.remove_rows(row, 1)
    }

    /// Removes `count` whole rows starting at `row`; the last row may be
    /// shorter than the others.
    pub fn remove_rows(&mut self, row: usize, count: usize) -> Option<Vec<Node<T>>> {
        let rows = self.rows();
        if count == 0 || !row.checked_add(count).is_some_and(|end| end <= rows) {
            debug!("remove_rows rejected: row {} count {} rows {}", row, count, rows);
            return None;
        }

        let len = self.len();
        let first = self.core.mapping().position(row, 0);
        let end = self.core.mapping().position(row + count, 0).min(len);
        let announcement = Announcement {
            bracket: Some(Change::RemoveBegin {
                parent: None,
                first: row,
                last: row + count - 1,
            }),
            follow_up: Vec::new(),
        };
        Some(self.core.remove_range(None, first, end - first, announcement))
    }

    pub fn insert_column(&mut self, column: usize) -> bool {
        self.insert_columns(column, 1)
    }

    /// Widens the grid by `count` columns at `column`, up to `MAX_COLUMNS`.
    ///
    /// The nodes reflow into the wider rows; surplus trailing rows are
    /// removed after the column bracket closes.
    #[instrument(level = "debug", skip(self))]
    pub fn insert_columns(&mut self, column: usize, count: usize) -> bool {
        let columns = self.columns();
        let widened = match columns.checked_add(count) {
            Some(widened) if count > 0 && column <= columns && widened <= MAX_COLUMNS => widened,
            _ => {
                debug!("insert_columns rejected: column {} count {} of {}", column, count, columns);
                return false;
            }
        };
        self.resize(
            widened,
            Change::ColumnInsertBegin {
                first: column,
                last: column + count - 1,
            },
        );
        self.headers.insert_unnamed(column, count);
        true
    }

    pub fn remove_column(&mut self, column: usize) -> bool {
        self.remove_columns(column, 1)
    }

    /// Narrows the grid by `count` columns starting at `column`.
    ///
    /// At least one column always remains. Filler rows are inserted after
    /// the column bracket closes so that every node still has a cell.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_columns(&mut self, column: usize, count: usize) -> bool {
        let columns = self.columns();
        if count == 0 || count >= columns || column > columns - count {
            debug!("remove_columns rejected: column {} count {} of {}", column, count, columns);
            return false;
        }
        self.resize(
            columns - count,
            Change::ColumnRemoveBegin {
                first: column,
                last: column + count - 1,
            },
        );
        self.headers.remove(column, count);
        true
    }

    fn resize(&mut self, new_columns: usize, begin: Change) {
        let len = self.len();
        let rows_before = self.rows();
        let rows_after = Grid::new(new_columns).row_count(len);

        self.core.remap(
            Announcement {
                bracket: Some(begin),
                follow_up: Vec::new(),
            },
            |grid| grid.set_columns(new_columns),
        );

        let reflow = if rows_after < rows_before {
            Some(Change::RemoveBegin {
                parent: None,
                first: rows_after,
                last: rows_before - 1,
            })
        } else if rows_after > rows_before {
            Some(Change::InsertBegin {
                parent: None,
                first: rows_before,
                last: rows_after - 1,
            })
        } else {
            None
        };
        let follow_up = if len > 0 {
            vec![Change::DataChanged {
                parent: None,
                top_left: (0, 0),
                bottom_right: self.core.mapping().cell(len - 1),
            }]
        } else {
            Vec::new()
        };
        self.core.remap(
            Announcement {
                bracket: reflow,
                follow_up,
            },
            |_| (),
        );
        debug!("resized to {} column(s): {} -> {} row(s)", new_columns, rows_before, rows_after);
    }

    /// Handle of cell `(row, column)`, None for cells without a node.
    pub fn index(&self, row: usize, column: usize) -> Option<ModelIndex> {
        if column >= self.columns() {
            return None;
        }
        let pos = self.core.mapping().position(row, column);
        self.core
            .arena()
            .child(None, pos)
            .map(|id| ModelIndex::new(row, column, id, None))
    }

    /// Handle of a member.
    pub fn index_of(&self, id: NodeId) -> StoreResult<ModelIndex> {
        let (_, pos) = self.core.locate(id)?;
        let (row, column) = self.core.mapping().cell(pos);
        Ok(ModelIndex::new(row, column, id, None))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<T>> {
        self.core.arena().node(id)
    }

    pub fn set_data(&mut self, id: NodeId, data: T) -> StoreResult<T> {
        self.core.set_data(id, data)
    }

    /// Lazy row-major walk over every occupied cell; clone it to restart.
    pub fn iter(&self) -> impl Iterator<Item = ModelIndex> + Clone + '_ {
        (0..self.len()).filter_map(move |pos| {
            let (row, column) = self.core.mapping().cell(pos);
            self.index(row, column)
        })
    }

    /// Nodes of one row, left to right.
    pub fn row(&self, row: usize) -> Vec<&Node<T>> {
        (0..self.columns())
            .filter_map(|column| self.index(row, column))
            .filter_map(|index| self.node(index.node_id()))
            .collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node<T>> + '_ {
        let arena = self.core.arena();
        arena
            .children(None)
            .unwrap_or_default()
            .iter()
            .filter_map(move |&id| arena.node(id))
    }

    /// Member ids in flat order.
    pub fn ids(&self) -> &[NodeId] {
        self.core.arena().children(None).unwrap_or_default()
    }

    /// First member named `name`.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        let arena = self.core.arena();
        arena
            .children(None)
            .unwrap_or_default()
            .iter()
            .copied()
            .find(|&id| arena.node(id).is_some_and(|n| n.name == name))
    }
}

impl<T> ItemModel for TableStore<T> {
    type Data = T;

    fn row_count(&self, parent: Option<&ModelIndex>) -> usize {
        match parent {
            None => self.rows(),
            Some(_) => 0,
        }
    }

    fn column_count(&self) -> usize {
        self.columns()
    }

    fn index(&self, row: usize, column: usize, parent: Option<&ModelIndex>) -> Option<ModelIndex> {
        if parent.is_some() {
            return None;
        }
        TableStore::index(self, row, column)
    }

    fn parent(&self, _index: &ModelIndex) -> Option<ModelIndex> {
        None
    }

    fn resolve(&self, index: &ModelIndex) -> Option<&Node<T>> {
        self.node(index.node_id())
    }

    fn header(&self, column: usize) -> String {
        self.headers.label(column)
    }
}
