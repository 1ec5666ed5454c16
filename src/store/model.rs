//! View-facing contract shared by every store.

use std::collections::BTreeMap;

use crate::domain::{ModelIndex, Node, Role, RoleValue};

/// Structural queries and data lookup for the presentation layer.
///
/// A view only needs the `(row, column, parent)` triple carried by each
/// [`ModelIndex`] to walk the structure; it never sees the arena.
pub trait ItemModel {
    type Data;

    /// Rows under `parent`, the root for `None`.
    fn row_count(&self, parent: Option<&ModelIndex>) -> usize;

    fn column_count(&self) -> usize;

    fn index(&self, row: usize, column: usize, parent: Option<&ModelIndex>) -> Option<ModelIndex>;

    /// Handle of the owner of `index`; `None` for rows directly under the root.
    fn parent(&self, index: &ModelIndex) -> Option<ModelIndex>;

    /// Node behind a handle, `None` when the handle no longer resolves.
    fn resolve(&self, index: &ModelIndex) -> Option<&Node<Self::Data>>;

    fn header(&self, column: usize) -> String;

    fn has_index(&self, row: usize, column: usize, parent: Option<&ModelIndex>) -> bool {
        self.index(row, column, parent).is_some()
    }

    fn data(&self, index: &ModelIndex, role: Role) -> Option<RoleValue<'_, Self::Data>> {
        self.resolve(index).map(|node| RoleValue::of(node, role))
    }
}

/// Column labels; unnamed columns show their 1-based number unless
/// numbering is turned off.
///
/// Only named columns are stored, so opening unnamed columns costs nothing
/// per column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headers {
    names: BTreeMap<usize, String>,
    len: usize,
    numbered: bool,
}

impl Default for Headers {
    fn default() -> Self {
        Self {
            names: BTreeMap::new(),
            len: 0,
            numbered: true,
        }
    }
}

impl Headers {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let len = names.len();
        let names = names
            .into_iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .collect();
        Self {
            names,
            len,
            numbered: true,
        }
    }

    pub fn numbered(mut self, numbered: bool) -> Self {
        self.numbered = numbered;
        self
    }

    /// Declared columns, named or not.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Name of `column`, or its 1-based number when unnamed.
    pub fn label(&self, column: usize) -> String {
        match self.names.get(&column) {
            Some(name) => name.clone(),
            None if self.numbered => column.saturating_add(1).to_string(),
            None => String::new(),
        }
    }

    /// Opens `count` unnamed columns at `column`, shifting the names after it.
    pub(crate) fn insert_unnamed(&mut self, column: usize, count: usize) {
        if column > self.len {
            return;
        }
        let tail = self.names.split_off(&column);
        self.names.extend(
            tail.into_iter()
                .filter_map(|(at, name)| at.checked_add(count).map(|at| (at, name))),
        );
        self.len = self.len.saturating_add(count);
    }

    pub(crate) fn remove(&mut self, column: usize, count: usize) {
        let end = column.saturating_add(count).min(self.len);
        if column >= end {
            return;
        }
        let removed = end - column;
        let tail = self.names.split_off(&column);
        self.names.extend(
            tail.into_iter()
                .filter(|(at, _)| *at >= end)
                .map(|(at, name)| (at - removed, name)),
        );
        self.len -= removed;
    }
}
