use tracing::{debug, instrument};

use crate::domain::{ModelIndex, Node, NodeId, StoreError, StoreResult, TreeNode};
use crate::store::engine::Core;
use crate::store::mapping::{RowMapping, Rows};
use crate::store::model::{Headers, ItemModel};
use crate::store::notify::{StoreObserver, SubscriptionId};

/// Hierarchy of nodes under an implicit root.
///
/// Parents are addressed by [`NodeId`]; `None` stands for the root. Removing
/// a node releases its whole subtree.
#[derive(Debug)]
pub struct TreeStore<T> {
    core: Core<T, Rows>,
    headers: Headers,
}

impl<T> Default for TreeStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TreeStore<T> {
    pub fn new() -> Self {
        Self {
            core: Core::new(Rows),
            headers: Headers::new(["Name"]),
        }
    }

    pub fn with_headers<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            core: Core::new(Rows),
            headers: Headers::new(names),
        }
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn set_headers(&mut self, headers: Headers) {
        self.headers = headers;
    }

    /// Number of nodes at every level.
    pub fn len(&self) -> usize {
        self.core.arena().len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.arena().is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.core.arena().contains(id)
    }

    pub fn subscribe(&mut self, observer: impl StoreObserver + 'static) -> SubscriptionId {
        self.core.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.core.unsubscribe(id)
    }

    /// Inserts `node` as child `pos` of `parent`.
    ///
    /// `Ok(None)` when `pos` is out of range, `ParentNotFound` when `parent`
    /// is not a member.
    #[instrument(level = "debug", skip(self, node), fields(name = %node.name))]
    pub fn insert(
        &mut self,
        node: Node<T>,
        parent: Option<NodeId>,
        pos: isize,
    ) -> StoreResult<Option<NodeId>> {
        Ok(self
            .insert_many(vec![node], parent, pos)?
            .and_then(|ids| ids.into_iter().next()))
    }

    pub fn insert_many(
        &mut self,
        nodes: Vec<Node<T>>,
        parent: Option<NodeId>,
        pos: isize,
    ) -> StoreResult<Option<Vec<NodeId>>> {
        self.core.insert(parent, pos, nodes)
    }

    /// Removes a node with its descendants; returns the node itself.
    pub fn delete(&mut self, id: NodeId) -> StoreResult<Node<T>> {
        self.core.remove(id)
    }

    /// Removes nodes deepest-last-first. A node listed together with one of
    /// its ancestors is removed before the ancestor.
    pub fn delete_many(&mut self, ids: &[NodeId]) -> StoreResult<Vec<Node<T>>> {
        self.core.remove_many(ids)
    }

    /// Moves `id` under `dst_parent` so that it ends at `pos` among the
    /// children not being moved.
    pub fn move_node(
        &mut self,
        id: NodeId,
        dst_parent: Option<NodeId>,
        pos: isize,
    ) -> StoreResult<bool> {
        self.core.move_many(&[id], dst_parent, pos)
    }

    /// Moves nodes as one block under `dst_parent`, keeping their pre-order.
    pub fn move_many(
        &mut self,
        ids: &[NodeId],
        dst_parent: Option<NodeId>,
        pos: isize,
    ) -> StoreResult<bool> {
        self.core.move_many(ids, dst_parent, pos)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn clear(&mut self) {
        self.core.reset();
    }

    /// Inserts `nodes` as children `row..` of `parent`.
    ///
    /// `Ok(None)` when `row` is past the last child or `nodes` is empty.
    pub fn insert_rows(
        &mut self,
        parent: Option<NodeId>,
        row: usize,
        nodes: Vec<Node<T>>,
    ) -> StoreResult<Option<Vec<NodeId>>> {
        let len = self.core.child_count(parent)?;
        if nodes.is_empty() || row > len {
            debug!("insert_rows rejected: row {} of {} with {} node(s)", row, len, nodes.len());
            return Ok(None);
        }
        let announcement = self.core.mapping().on_insert(parent, row, nodes.len(), len);
        Ok(Some(self.core.attach(parent, row, nodes, announcement)))
    }

    /// Removes `count` consecutive children of `parent` with their subtrees.
    pub fn remove_rows(
        &mut self,
        parent: Option<NodeId>,
        row: usize,
        count: usize,
    ) -> StoreResult<Option<Vec<Node<T>>>> {
        let len = self.core.child_count(parent)?;
        if count == 0 || !row.checked_add(count).is_some_and(|end| end <= len) {
            debug!("remove_rows rejected: row {} count {} of {}", row, count, len);
            return Ok(None);
        }
        let announcement = self.core.mapping().on_remove(parent, row, count, len);
        Ok(Some(self.core.remove_range(parent, row, count, announcement)))
    }

    /// Moves `count` children of `src_parent` starting at `src_row` under
    /// `dst_parent`, where the block starts at `dst_row` among the children
    /// not being moved.
    pub fn move_rows(
        &mut self,
        src_parent: Option<NodeId>,
        src_row: usize,
        count: usize,
        dst_parent: Option<NodeId>,
        dst_row: usize,
    ) -> StoreResult<bool> {
        self.core
            .move_range(src_parent, src_row, count, dst_parent, dst_row)
    }

    /// Handle of child `row` of `parent`.
    pub fn index(&self, row: usize, column: usize, parent: Option<NodeId>) -> Option<ModelIndex> {
        if column >= self.column_count() {
            return None;
        }
        self.core
            .arena()
            .child(parent, row)
            .map(|id| ModelIndex::new(row, column, id, parent))
    }

    pub fn index_of(&self, id: NodeId) -> StoreResult<ModelIndex> {
        let (parent, row) = self.core.locate(id)?;
        Ok(ModelIndex::new(row, 0, id, parent))
    }

    pub fn children(&self, parent: Option<NodeId>) -> StoreResult<&[NodeId]> {
        let arena = self.core.arena();
        match parent {
            None => Ok(arena.children(None).unwrap_or_default()),
            Some(p) => arena.children(Some(p)).ok_or(StoreError::ParentNotFound(p)),
        }
    }

    pub fn parent_of(&self, id: NodeId) -> StoreResult<Option<NodeId>> {
        self.core.locate(id).map(|(parent, _)| parent)
    }

    /// Ancestors of `id`, nearest first, up to a top-level node.
    pub fn ancestors(&self, id: NodeId) -> StoreResult<Vec<NodeId>> {
        if !self.contains(id) {
            return Err(StoreError::NodeNotFound(id));
        }
        Ok(self.core.arena().ancestors(id).collect())
    }

    /// Number of levels below the root.
    pub fn depth(&self) -> usize {
        self.core.arena().depth()
    }

    pub fn leaf_nodes(&self) -> Vec<NodeId> {
        self.core.arena().leaf_nodes()
    }

    /// Rows from the root down to `id`.
    pub fn path(&self, id: NodeId) -> StoreResult<Vec<usize>> {
        self.core.arena().path(id).ok_or(StoreError::NodeNotFound(id))
    }

    /// First node named `name`, in pre-order.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        let arena = self.core.arena();
        arena
            .iter()
            .find(|&id| arena.node(id).is_some_and(|n| n.name == name))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<T>> {
        self.core.arena().node(id)
    }

    pub fn tree_node(&self, id: NodeId) -> Option<&TreeNode<T>> {
        self.core.arena().get(id)
    }

    pub fn set_data(&mut self, id: NodeId, data: T) -> StoreResult<T> {
        self.core.set_data(id, data)
    }

    /// Lazy pre-order walk of the handles below `parent`; only its direct
    /// children unless `recursive`. Clone it to restart.
    pub fn iter(
        &self,
        parent: Option<NodeId>,
        recursive: bool,
    ) -> impl Iterator<Item = ModelIndex> + Clone + '_ {
        let arena = self.core.arena();
        arena.iter_from(parent, recursive).filter_map(move |id| {
            let node = arena.get(id)?;
            Some(ModelIndex::new(node.row(), 0, id, node.parent()))
        })
    }

    /// Every node id in pre-order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + Clone + '_ {
        self.core.arena().iter()
    }
}

impl<T> ItemModel for TreeStore<T> {
    type Data = T;

    fn row_count(&self, parent: Option<&ModelIndex>) -> usize {
        let parent = parent.map(ModelIndex::node_id);
        self.core.arena().child_count(parent).unwrap_or(0)
    }

    fn column_count(&self) -> usize {
        self.headers.len().max(1)
    }

    fn index(&self, row: usize, column: usize, parent: Option<&ModelIndex>) -> Option<ModelIndex> {
        TreeStore::index(self, row, column, parent.map(ModelIndex::node_id))
    }

    fn parent(&self, index: &ModelIndex) -> Option<ModelIndex> {
        let parent = index.parent_id()?;
        self.index_of(parent).ok()
    }

    /// Resolves only while the node still lives under the handle's parent.
    fn resolve(&self, index: &ModelIndex) -> Option<&Node<T>> {
        let node = self.core.arena().get(index.node_id())?;
        (node.parent() == index.parent_id()).then_some(&node.node)
    }

    fn header(&self, column: usize) -> String {
        self.headers.label(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_nested_node_when_deleting_parent_then_subtree_released() {
        let mut tree = TreeStore::new();
        let x = tree.insert(Node::new("X", 1), None, -1).unwrap().unwrap();
        let y = tree.insert(Node::new("Y", 2), Some(x), -1).unwrap().unwrap();

        tree.delete(x).unwrap();
        assert_eq!(tree.row_count(None), 0);
        assert!(tree.node(y).is_none());
        assert!(tree.is_empty());
    }

    #[test]
    fn given_stale_handle_when_resolving_then_none() {
        let mut tree = TreeStore::new();
        let x = tree.insert(Node::new("X", 1), None, -1).unwrap().unwrap();
        let index = tree.index_of(x).unwrap();
        tree.delete(x).unwrap();
        let z = tree.insert(Node::new("Z", 3), None, -1).unwrap().unwrap();

        assert_ne!(x, z);
        assert!(tree.resolve(&index).is_none());
    }

    #[test]
    fn given_unknown_parent_when_listing_children_then_parent_not_found() {
        let mut tree = TreeStore::<u8>::new();
        let x = tree.insert(Node::new("X", 1), None, -1).unwrap().unwrap();
        tree.delete(x).unwrap();
        assert_eq!(tree.children(Some(x)).unwrap_err(), StoreError::ParentNotFound(x));
        assert!(tree.children(None).unwrap().is_empty());
    }
}
