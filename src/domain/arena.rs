use generational_arena::Arena;
use tracing::{instrument, trace};

use crate::domain::node::{Node, NodeId};

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug)]
pub struct TreeNode<T> {
    /// Name and payload
    pub node: Node<T>,
    /// Owning node, None for direct children of the root
    parent: Option<NodeId>,
    /// Owned children in order
    children: Vec<NodeId>,
    /// Position among the owner's children, kept current on every splice
    row: usize,
}

impl<T> TreeNode<T> {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn row(&self) -> usize {
        self.row
    }
}

/// Arena-based tree structure for ordered, owned nodes.
///
/// The synthetic root is the arena itself: its children are the top-level
/// sequence, and a node whose parent is `None` is a direct child of the root.
/// Flat stores only ever use the top-level sequence.
#[derive(Debug)]
pub struct TreeArena<T> {
    /// Arena storage for all tree nodes
    arena: Arena<TreeNode<T>>,
    /// Children of the synthetic root
    top: Vec<NodeId>,
}

impl<T> Default for TreeArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TreeArena<T> {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            top: Vec::new(),
        }
    }

    /// Number of nodes at any depth.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id.index())
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode<T>> {
        self.arena.get(id.index())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode<T>> {
        self.arena.get_mut(id.index())
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<T>> {
        self.get(id).map(|n| &n.node)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        self.get_mut(id).map(|n| &mut n.node)
    }

    /// Children of `parent`, or of the root for `None`.
    ///
    /// Returns None when `parent` is not a member.
    pub fn children(&self, parent: Option<NodeId>) -> Option<&[NodeId]> {
        match parent {
            None => Some(&self.top),
            Some(p) => self.get(p).map(|n| n.children.as_slice()),
        }
    }

    pub fn child_count(&self, parent: Option<NodeId>) -> Option<usize> {
        self.children(parent).map(<[NodeId]>::len)
    }

    pub fn child(&self, parent: Option<NodeId>, row: usize) -> Option<NodeId> {
        self.children(parent).and_then(|c| c.get(row).copied())
    }

    /// Owner and row of a member node.
    pub fn locate(&self, id: NodeId) -> Option<(Option<NodeId>, usize)> {
        self.get(id).map(|n| (n.parent, n.row))
    }

    /// Allocates `nodes` and splices them into `parent` starting at `row`.
    ///
    /// The caller has validated `parent` and `row`.
    #[instrument(level = "trace", skip(self, nodes))]
    pub fn attach(
        &mut self,
        parent: Option<NodeId>,
        row: usize,
        nodes: Vec<Node<T>>,
    ) -> Vec<NodeId> {
        let ids: Vec<NodeId> = nodes
            .into_iter()
            .map(|node| {
                NodeId(self.arena.insert(TreeNode {
                    node,
                    parent,
                    children: Vec::new(),
                    row: 0,
                }))
            })
            .collect();

        let spliced = ids.clone();
        self.splice(parent, row, move |siblings| {
            let at = row.min(siblings.len());
            siblings.splice(at..at, spliced);
        });
        ids
    }

    /// Moves a member node under `new_parent` so that it ends at `row`.
    ///
    /// The node leaves its old owner and joins the new one within this call,
    /// so no caller ever observes it in both sequences or in neither.
    #[instrument(level = "trace", skip(self))]
    pub fn reparent(&mut self, id: NodeId, new_parent: Option<NodeId>, row: usize) {
        let Some((old_parent, old_row)) = self.locate(id) else {
            return;
        };

        self.splice(old_parent, old_row, |siblings| {
            siblings.remove(old_row);
        });
        if let Some(node) = self.get_mut(id) {
            node.parent = new_parent;
        }
        self.splice(new_parent, row, |siblings| {
            let at = row.min(siblings.len());
            siblings.insert(at, id);
        });
        trace!("reparented {} from {:?}[{}] to {:?}[{}]", id, old_parent, old_row, new_parent, row);
    }

    /// Removes a member node and releases its whole subtree.
    ///
    /// Returns the removed node's own name and payload.
    #[instrument(level = "trace", skip(self))]
    pub fn remove(&mut self, id: NodeId) -> Option<Node<T>> {
        let (parent, row) = self.locate(id)?;
        self.splice(parent, row, |siblings| {
            siblings.remove(row);
        });

        let released: Vec<NodeId> = self.iter_postorder(id).collect();
        let mut removed = None;
        for node_id in released {
            if let Some(tree_node) = self.arena.remove(node_id.index()) {
                if node_id == id {
                    removed = Some(tree_node.node);
                }
            }
        }
        removed
    }

    /// Drops every node and starts over with an empty root.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.top.clear();
    }

    /// True when `ancestor` is `id` itself or one of its owners.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        id == ancestor || self.ancestors(id).any(|a| a == ancestor)
    }

    /// Owners of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_, T> {
        Ancestors {
            arena: self,
            current: self.get(id).and_then(|n| n.parent),
        }
    }

    /// Row path from the root down to `id`.
    ///
    /// Paths order lexicographically in pre-order.
    pub fn path(&self, id: NodeId) -> Option<Vec<usize>> {
        let node = self.get(id)?;
        let mut path: Vec<usize> = self
            .ancestors(id)
            .filter_map(|a| self.get(a).map(|n| n.row))
            .collect();
        path.reverse();
        path.push(node.row);
        Some(path)
    }

    /// Pre-order walk of the descendants of `parent` (root for `None`).
    ///
    /// Without `recursive` only the direct children are visited.
    pub fn iter_from(&self, parent: Option<NodeId>, recursive: bool) -> PreOrder<'_, T> {
        PreOrder::new(self, parent, recursive)
    }

    /// Pre-order walk of every node.
    pub fn iter(&self) -> PreOrder<'_, T> {
        self.iter_from(None, true)
    }

    /// Post-order walk of `id` and its descendants, `id` last.
    pub fn iter_postorder(&self, id: NodeId) -> PostOrderIterator<'_, T> {
        PostOrderIterator::new(self, id)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        self.top
            .iter()
            .map(|&child| self.calculate_depth(child))
            .max()
            .unwrap_or(0)
    }

    fn calculate_depth(&self, id: NodeId) -> usize {
        if let Some(node) = self.get(id) {
            1 + node
                .children
                .iter()
                .map(|&child| self.calculate_depth(child))
                .max()
                .unwrap_or(0)
        } else {
            0
        }
    }

    /// Collects all nodes without children, in pre-order.
    #[instrument(level = "debug", skip(self))]
    pub fn leaf_nodes(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|&id| self.get(id).is_some_and(|n| n.children.is_empty()))
            .collect()
    }

    /// Runs `f` on the sibling sequence of `parent`, then refreshes the cached
    /// rows from `from` onwards.
    fn splice<R>(
        &mut self,
        parent: Option<NodeId>,
        from: usize,
        f: impl FnOnce(&mut Vec<NodeId>) -> R,
    ) -> Option<R> {
        let mut siblings = match parent {
            None => std::mem::take(&mut self.top),
            Some(p) => std::mem::take(&mut self.get_mut(p)?.children),
        };

        let result = f(&mut siblings);
        for (row, id) in siblings.iter().enumerate().skip(from) {
            if let Some(node) = self.arena.get_mut(id.index()) {
                node.row = row;
            }
        }

        match parent {
            None => self.top = siblings,
            Some(p) => {
                if let Some(node) = self.get_mut(p) {
                    node.children = siblings;
                }
            }
        }
        Some(result)
    }
}

pub struct Ancestors<'a, T> {
    arena: &'a TreeArena<T>,
    current: Option<NodeId>,
}

impl<T> Iterator for Ancestors<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        self.current = self.arena.get(current).and_then(|n| n.parent);
        Some(current)
    }
}

/// Lazy pre-order walk; clone it to restart from the same scope.
pub struct PreOrder<'a, T> {
    arena: &'a TreeArena<T>,
    stack: Vec<NodeId>,
    recursive: bool,
}

impl<T> Clone for PreOrder<'_, T> {
    fn clone(&self) -> Self {
        Self {
            arena: self.arena,
            stack: self.stack.clone(),
            recursive: self.recursive,
        }
    }
}

impl<'a, T> PreOrder<'a, T> {
    fn new(arena: &'a TreeArena<T>, parent: Option<NodeId>, recursive: bool) -> Self {
        // Children in reverse order for left-to-right traversal
        let stack: Vec<NodeId> = arena
            .children(parent)
            .map(|c| c.iter().rev().copied().collect())
            .unwrap_or_default();
        Self {
            arena,
            stack,
            recursive,
        }
    }
}

impl<T> Iterator for PreOrder<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        if self.recursive {
            if let Some(node) = self.arena.get(current) {
                self.stack.extend(node.children.iter().rev().copied());
            }
        }
        Some(current)
    }
}

pub struct PostOrderIterator<'a, T> {
    arena: &'a TreeArena<T>,
    stack: Vec<(NodeId, bool)>,
}

impl<'a, T> PostOrderIterator<'a, T> {
    fn new(arena: &'a TreeArena<T>, id: NodeId) -> Self {
        let mut stack = Vec::new();
        if arena.contains(id) {
            stack.push((id, false));
        }
        Self { arena, stack }
    }
}

impl<T> Iterator for PostOrderIterator<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if let Some(node) = self.arena.get(current) {
                if !visited {
                    self.stack.push((current, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some(current);
                }
            }
        }
        None
    }
}
