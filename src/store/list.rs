use tracing::{debug, instrument};

use crate::domain::position;
use crate::domain::{ModelIndex, Node, NodeId, StoreResult};
use crate::store::engine::Core;
use crate::store::mapping::{RowMapping, Rows};
use crate::store::model::{Headers, ItemModel};
use crate::store::notify::{StoreObserver, SubscriptionId};

/// Flat ordered sequence of nodes, one column.
#[derive(Debug)]
pub struct ListStore<T> {
    core: Core<T, Rows>,
    headers: Headers,
}

impl<T> Default for ListStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ListStore<T> {
    pub fn new() -> Self {
        Self {
            core: Core::new(Rows),
            headers: Headers::default(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>) -> Self {
        self.headers = Headers::new([name.into()]);
        self
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn set_headers(&mut self, headers: Headers) {
        self.headers = headers;
    }

    pub fn len(&self) -> usize {
        self.core.arena().child_count(None).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&mut self, observer: impl StoreObserver + 'static) -> SubscriptionId {
        self.core.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.core.unsubscribe(id)
    }

    /// Inserts `node` at signed position `pos` (`-1` appends).
    ///
    /// Returns None, dropping the node, when `pos` is out of range.
    #[instrument(level = "debug", skip(self, node), fields(name = %node.name))]
    pub fn insert(&mut self, node: Node<T>, pos: isize) -> Option<NodeId> {
        self.insert_many(vec![node], pos)
            .and_then(|ids| ids.into_iter().next())
    }

    /// Inserts a contiguous batch at signed position `pos`.
    pub fn insert_many(&mut self, nodes: Vec<Node<T>>, pos: isize) -> Option<Vec<NodeId>> {
        self.core.insert(None, pos, nodes).ok().flatten()
    }

    /// Removes a member and hands it back.
    pub fn delete(&mut self, id: NodeId) -> StoreResult<Node<T>> {
        self.core.remove(id)
    }

    /// Removes members, last position first.
    pub fn delete_many(&mut self, ids: &[NodeId]) -> StoreResult<Vec<Node<T>>> {
        self.core.remove_many(ids)
    }

    /// Moves a member so that it ends at `pos` (`-1` moves it to the end).
    ///
    /// `Ok(false)` when `pos` is out of range. Moving a node onto its own
    /// position is a no-op without notifications.
    pub fn move_node(&mut self, id: NodeId, pos: isize) -> StoreResult<bool> {
        self.core.move_many(&[id], None, pos)
    }

    /// Moves members as one block starting at `pos`, keeping their order.
    pub fn move_many(&mut self, ids: &[NodeId], pos: isize) -> StoreResult<bool> {
        self.core.move_many(ids, None, pos)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn clear(&mut self) {
        self.core.reset();
    }

    /// Inserts exactly `count` nodes at `row`.
    pub fn insert_rows(&mut self, row: usize, count: usize, nodes: Vec<Node<T>>) -> bool {
        if nodes.len() != count || row > self.len() {
            debug!("insert_rows rejected: row {} count {} nodes {}", row, count, nodes.len());
            return false;
        }
        self.insert_many(nodes, row as isize).is_some()
    }

    pub fn remove_row(&mut self, row: usize) -> Option<Node<T>> {
        self.remove_rows(row, 1).and_then(|mut nodes| nodes.pop())
    }

    /// Removes `count` consecutive rows starting at `row`.
    pub fn remove_rows(&mut self, row: usize, count: usize) -> Option<Vec<Node<T>>> {
        let len = self.len();
        if count == 0 || !row.checked_add(count).is_some_and(|end| end <= len) {
            debug!("remove_rows rejected: row {} count {} len {}", row, count, len);
            return None;
        }
        let announcement = self.core.mapping().on_remove(None, row, count, len);
        Some(self.core.remove_range(None, row, count, announcement))
    }

    /// Moves the row at `src` so that it ends at `dst`.
    pub fn move_row(&mut self, src: usize, dst: usize) -> bool {
        let Some(id) = self.core.arena().child(None, src) else {
            return false;
        };
        let Ok(dst) = isize::try_from(dst) else {
            return false;
        };
        self.core.move_many(&[id], None, dst).unwrap_or(false)
    }

    /// Moves `count` rows starting at `src` as one block that ends up
    /// starting at `dst` of the rows left behind.
    pub fn move_rows(&mut self, src: usize, count: usize, dst: usize) -> bool {
        self.core
            .move_range(None, src, count, None, dst)
            .unwrap_or(false)
    }

    /// Handle of the node at `row`, None outside `[0, len)`.
    pub fn get(&self, row: usize) -> Option<ModelIndex> {
        self.core
            .arena()
            .child(None, row)
            .map(|id| ModelIndex::new(row, 0, id, None))
    }

    /// Handle at signed position `pos` (`-1` is the last node).
    pub fn get_relative(&self, pos: isize) -> Option<ModelIndex> {
        let row = position::normalize(pos, self.len().saturating_sub(1));
        usize::try_from(row).ok().and_then(|row| self.get(row))
    }

    /// Current row of a member.
    pub fn position(&self, id: NodeId) -> StoreResult<usize> {
        self.core.locate(id).map(|(_, row)| row)
    }

    pub fn index_of(&self, id: NodeId) -> StoreResult<ModelIndex> {
        self.position(id).map(|row| ModelIndex::new(row, 0, id, None))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<T>> {
        self.core.arena().node(id)
    }

    /// Replaces the payload of a member, returning the previous one.
    pub fn set_data(&mut self, id: NodeId, data: T) -> StoreResult<T> {
        self.core.set_data(id, data)
    }

    /// Lazy walk over every handle in order; clone it to restart.
    pub fn iter(&self) -> impl Iterator<Item = ModelIndex> + Clone + '_ {
        (0..self.len()).filter_map(move |row| self.get(row))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node<T>> + '_ {
        let arena = self.core.arena();
        arena
            .children(None)
            .unwrap_or_default()
            .iter()
            .filter_map(move |&id| arena.node(id))
    }

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

impl<T> ItemModel for ListStore<T> {
    type Data = T;

    fn row_count(&self, parent: Option<&ModelIndex>) -> usize {
        match parent {
            None => self.len(),
            Some(_) => 0,
        }
    }

    fn column_count(&self) -> usize {
        1
    }

    fn index(&self, row: usize, column: usize, parent: Option<&ModelIndex>) -> Option<ModelIndex> {
        if column != 0 || parent.is_some() {
            return None;
        }
        self.get(row)
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

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::domain::Role;
    use crate::store::notify::Change;

    fn names(store: &ListStore<i32>) -> Vec<&str> {
        store.nodes().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn given_appends_when_moving_first_to_end_then_rotates() {
        let mut store = ListStore::new();
        let a = store.insert(Node::new("A", 1), -1).unwrap();
        store.insert(Node::new("B", 2), -1).unwrap();
        store.insert(Node::new("C", 3), -1).unwrap();
        assert_eq!(names(&store), vec!["A", "B", "C"]);

        assert!(store.move_node(a, -1).unwrap());
        assert_eq!(names(&store), vec!["B", "C", "A"]);
    }

    #[test]
    fn given_insert_when_observed_then_brackets_single_row() {
        let mut store = ListStore::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        store.subscribe(move |c: &Change| sink.borrow_mut().push(*c));

        store.insert(Node::new("A", 1), 0).unwrap();
        assert_eq!(
            *log.borrow(),
            vec![
                Change::InsertBegin {
                    parent: None,
                    first: 0,
                    last: 0
                },
                Change::InsertEnd
            ]
        );
    }

    #[test]
    fn given_handle_when_looking_up_data_then_uses_role() {
        let mut store = ListStore::new();
        store.insert(Node::new("A", 10), -1).unwrap();
        let index = store.get(0).unwrap();
        assert_eq!(store.data(&index, Role::Data).and_then(|v| v.as_data().copied()), Some(10));
        assert_eq!(store.data(&index, Role::Name).and_then(|v| v.as_name()), Some("A"));
        assert!(store.get(1).is_none());
        assert_eq!(store.header(0), "1");
    }

    #[test]
    fn given_relative_position_when_getting_then_counts_from_end() {
        let mut store = ListStore::new();
        store.insert_many(vec![Node::new("A", 1), Node::new("B", 2)], -1).unwrap();
        let last = store.get_relative(-1).unwrap();
        assert_eq!(store.resolve(&last).unwrap().name, "B");
        assert!(ListStore::<i32>::new().get_relative(-1).is_none());
    }
}
