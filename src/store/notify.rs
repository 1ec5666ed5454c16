//! Change notifications and the observer registry.
//!
//! Every structural mutation is announced as a begin/end pair. Observers only
//! ever receive `&Change`, so they cannot reach back into the store while a
//! bracket is open.

use std::fmt;

use tracing::{debug, trace};

use crate::domain::NodeId;

/// Structural change announced to observers.
///
/// `parent` fields name the owning node of the affected rows; `None` is the
/// root (every row of a list or table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    InsertBegin {
        parent: Option<NodeId>,
        first: usize,
        last: usize,
    },
    InsertEnd,
    RemoveBegin {
        parent: Option<NodeId>,
        first: usize,
        last: usize,
    },
    RemoveEnd,
    /// `dst_row` is the row in the destination, counted before the move,
    /// in front of which the moved rows land.
    MoveBegin {
        src_parent: Option<NodeId>,
        first: usize,
        last: usize,
        dst_parent: Option<NodeId>,
        dst_row: usize,
    },
    MoveEnd,
    ResetBegin,
    ResetEnd,
    ColumnInsertBegin {
        first: usize,
        last: usize,
    },
    ColumnInsertEnd,
    ColumnRemoveBegin {
        first: usize,
        last: usize,
    },
    ColumnRemoveEnd,
    /// Cells from `top_left` to `bottom_right` (row-major, inclusive) under
    /// `parent` now hold different nodes or data.
    DataChanged {
        parent: Option<NodeId>,
        top_left: (usize, usize),
        bottom_right: (usize, usize),
    },
}

impl Change {
    /// True for the opening half of a bracket.
    pub fn is_begin(&self) -> bool {
        matches!(
            self,
            Change::InsertBegin { .. }
                | Change::RemoveBegin { .. }
                | Change::MoveBegin { .. }
                | Change::ResetBegin
                | Change::ColumnInsertBegin { .. }
                | Change::ColumnRemoveBegin { .. }
        )
    }

    /// True for the closing half of a bracket.
    pub fn is_end(&self) -> bool {
        matches!(
            self,
            Change::InsertEnd
                | Change::RemoveEnd
                | Change::MoveEnd
                | Change::ResetEnd
                | Change::ColumnInsertEnd
                | Change::ColumnRemoveEnd
        )
    }

    /// Matching end notification for a begin notification.
    pub fn end(&self) -> Option<Change> {
        match self {
            Change::InsertBegin { .. } => Some(Change::InsertEnd),
            Change::RemoveBegin { .. } => Some(Change::RemoveEnd),
            Change::MoveBegin { .. } => Some(Change::MoveEnd),
            Change::ResetBegin => Some(Change::ResetEnd),
            Change::ColumnInsertBegin { .. } => Some(Change::ColumnInsertEnd),
            Change::ColumnRemoveBegin { .. } => Some(Change::ColumnRemoveEnd),
            _ => None,
        }
    }
}

fn parent_label(parent: &Option<NodeId>) -> String {
    parent.map_or_else(|| "root".to_string(), |p| p.to_string())
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::InsertBegin { parent, first, last } => {
                write!(f, "insert-begin {} [{}..={}]", parent_label(parent), first, last)
            }
            Change::RemoveBegin { parent, first, last } => {
                write!(f, "remove-begin {} [{}..={}]", parent_label(parent), first, last)
            }
            Change::MoveBegin {
                src_parent,
                first,
                last,
                dst_parent,
                dst_row,
            } => write!(
                f,
                "move-begin {} [{}..={}] -> {} @{}",
                parent_label(src_parent),
                first,
                last,
                parent_label(dst_parent),
                dst_row
            ),
            Change::ColumnInsertBegin { first, last } => {
                write!(f, "column-insert-begin [{}..={}]", first, last)
            }
            Change::ColumnRemoveBegin { first, last } => {
                write!(f, "column-remove-begin [{}..={}]", first, last)
            }
            Change::DataChanged {
                parent,
                top_left,
                bottom_right,
            } => write!(
                f,
                "data-changed {} ({}, {})..=({}, {})",
                parent_label(parent),
                top_left.0,
                top_left.1,
                bottom_right.0,
                bottom_right.1
            ),
            Change::InsertEnd => write!(f, "insert-end"),
            Change::RemoveEnd => write!(f, "remove-end"),
            Change::MoveEnd => write!(f, "move-end"),
            Change::ResetBegin => write!(f, "reset-begin"),
            Change::ResetEnd => write!(f, "reset-end"),
            Change::ColumnInsertEnd => write!(f, "column-insert-end"),
            Change::ColumnRemoveEnd => write!(f, "column-remove-end"),
        }
    }
}

/// Receiver of store notifications.
pub trait StoreObserver {
    fn on_change(&mut self, change: &Change);
}

impl<F> StoreObserver for F
where
    F: FnMut(&Change),
{
    fn on_change(&mut self, change: &Change) {
        self(change)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Registry of observers, notified in subscription order.
#[derive(Default)]
pub struct Notifier {
    observers: Vec<(SubscriptionId, Box<dyn StoreObserver>)>,
    next_id: u64,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: impl StoreObserver + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        debug!("observer {:?} subscribed, {} active", id, self.len());
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        let removed = self.len() != before;
        if removed {
            debug!("observer {:?} unsubscribed, {} active", id, self.len());
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn emit(&mut self, change: Change) {
        trace!("{}", change);
        for (_, observer) in self.observers.iter_mut() {
            observer.on_change(&change);
        }
    }

    /// Emits `begin`, runs the mutation, then emits the matching end.
    ///
    /// Validation must be finished before calling this: once `begin` fires
    /// the mutation always completes.
    pub fn bracket<R>(&mut self, begin: Change, mutate: impl FnOnce() -> R) -> R {
        let end = begin.end();
        self.emit(begin);
        let result = mutate();
        if let Some(end) = end {
            self.emit(end);
        }
        result
    }
}
