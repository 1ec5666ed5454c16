//! Position handles and role-keyed data lookup.

use std::fmt;

use crate::domain::node::{Node, NodeId};

/// Opaque `(row, column, node)` reference into a store.
///
/// A handle is only meaningful until the next structural mutation of the
/// store that produced it. Resolving a handle whose node has been removed
/// yields `None`; a handle whose node merely shifted resolves to the same node
/// but reports a stale row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelIndex {
    row: usize,
    column: usize,
    node: NodeId,
    parent: Option<NodeId>,
}

impl ModelIndex {
    pub(crate) fn new(row: usize, column: usize, node: NodeId, parent: Option<NodeId>) -> Self {
        Self {
            row,
            column,
            node,
            parent,
        }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// Owning node, None when the node sits directly under the root.
    pub fn parent_id(&self) -> Option<NodeId> {
        self.parent
    }
}

impl fmt::Display for ModelIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) {}", self.row, self.column, self.node)
    }
}

/// Attribute selector used by data lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    /// The node's payload
    #[default]
    Data,
    /// The node's name
    Name,
}

/// Borrowed facet of a node selected by a [`Role`].
#[derive(Debug, PartialEq)]
pub enum RoleValue<'a, T> {
    Data(&'a T),
    Name(&'a str),
}

impl<'a, T> RoleValue<'a, T> {
    pub fn of(node: &'a Node<T>, role: Role) -> Self {
        match role {
            Role::Data => RoleValue::Data(&node.data),
            Role::Name => RoleValue::Name(&node.name),
        }
    }

    pub fn as_data(&self) -> Option<&'a T> {
        match self {
            RoleValue::Data(data) => Some(*data),
            RoleValue::Name(_) => None,
        }
    }

    pub fn as_name(&self) -> Option<&'a str> {
        match self {
            RoleValue::Name(name) => Some(*name),
            RoleValue::Data(_) => None,
        }
    }
}

impl<T: fmt::Display> fmt::Display for RoleValue<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleValue::Data(data) => write!(f, "{}", data),
            RoleValue::Name(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_node_when_selecting_roles_then_returns_matching_facet() {
        let node = Node::new("alpha", 7u8);
        assert_eq!(RoleValue::of(&node, Role::Data).as_data(), Some(&7));
        assert_eq!(RoleValue::of(&node, Role::Name).as_name(), Some("alpha"));
        assert_eq!(RoleValue::of(&node, Role::default()).as_name(), None);
    }
}
