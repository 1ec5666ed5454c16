//! Stored units: the payload-carrying node and its identifier.

use std::fmt;

use generational_arena::Index;

/// Stable identifier of a node inside one store.
///
/// Wraps a generational arena index: once a node is removed its id never
/// resolves again, even if the slot is reused by a later insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) Index);

impl NodeId {
    pub(crate) fn index(self) -> Index {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "#{}v{}", slot, generation)
    }
}

/// Smallest stored unit: a name plus an opaque payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<T> {
    pub name: String,
    pub data: T,
}

impl<T> Node<T> {
    pub fn new(name: impl Into<String>, data: T) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

impl<T: Default> Node<T> {
    /// Node with a default payload.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, T::default())
    }
}

impl<T> fmt::Display for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
