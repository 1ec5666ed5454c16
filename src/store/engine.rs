//! The single mutation engine behind every store.
//!
//! Owns the arena and the observer registry, validates each request up front
//! and wraps every structural change in the notifications chosen by the
//! store's [`RowMapping`].

use std::collections::HashSet;

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::domain::position;
use crate::domain::{Node, NodeId, StoreError, StoreResult, TreeArena};
use crate::store::mapping::{Announcement, Relocation, RowMapping};
use crate::store::notify::{Change, Notifier, StoreObserver, SubscriptionId};

#[derive(Debug)]
pub struct Engine<M> {
    mapping: M,
    notifier: Notifier,
}

/// Arena plus engine; split so that notification closures can borrow the
/// arena while the notifier is borrowed mutably.
#[derive(Debug)]
pub struct Core<T, M> {
    pub(crate) arena: TreeArena<T>,
    pub(crate) engine: Engine<M>,
}

impl<T, M: RowMapping> Core<T, M> {
    pub fn new(mapping: M) -> Self {
        Self {
            arena: TreeArena::new(),
            engine: Engine {
                mapping,
                notifier: Notifier::new(),
            },
        }
    }

    pub fn arena(&self) -> &TreeArena<T> {
        &self.arena
    }

    pub fn mapping(&self) -> &M {
        &self.engine.mapping
    }

    pub fn subscribe(&mut self, observer: impl StoreObserver + 'static) -> SubscriptionId {
        self.engine.notifier.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.engine.notifier.unsubscribe(id)
    }

    /// Child count of `parent`, or `ParentNotFound`.
    pub fn child_count(&self, parent: Option<NodeId>) -> StoreResult<usize> {
        match parent {
            None => Ok(self.arena.child_count(None).unwrap_or(0)),
            Some(p) => self.arena.child_count(Some(p)).ok_or(StoreError::ParentNotFound(p)),
        }
    }

    /// Owner and row of a member, or `NodeNotFound`.
    pub fn locate(&self, id: NodeId) -> StoreResult<(Option<NodeId>, usize)> {
        self.arena.locate(id).ok_or(StoreError::NodeNotFound(id))
    }

    /// Splices `nodes` into `parent` at signed position `pos`.
    ///
    /// `Ok(None)` when `pos` is out of range; nothing is mutated and the
    /// nodes are dropped.
    #[instrument(level = "debug", skip(self, nodes), fields(count = nodes.len()))]
    pub fn insert(
        &mut self,
        parent: Option<NodeId>,
        pos: isize,
        nodes: Vec<Node<T>>,
    ) -> StoreResult<Option<Vec<NodeId>>> {
        let len = self.child_count(parent)?;
        let Some(row) = position::checked(pos, len) else {
            debug!("insert rejected: position {} outside [0, {}]", pos, len);
            return Ok(None);
        };
        if nodes.is_empty() {
            return Ok(Some(Vec::new()));
        }

        let announcement = self.engine.mapping.on_insert(parent, row, nodes.len(), len);
        Ok(Some(self.attach(parent, row, nodes, announcement)))
    }

    /// Splices validated `nodes` in at `row`, announcing with `announcement`.
    pub fn attach(
        &mut self,
        parent: Option<NodeId>,
        row: usize,
        nodes: Vec<Node<T>>,
        announcement: Announcement,
    ) -> Vec<NodeId> {
        let arena = &mut self.arena;
        let ids = self
            .engine
            .announce(announcement, || arena.attach(parent, row, nodes));
        debug!("attached {} node(s) under {:?} at row {}", ids.len(), parent, row);
        ids
    }

    /// Removes one member and its subtree.
    #[instrument(level = "debug", skip(self))]
    pub fn remove(&mut self, id: NodeId) -> StoreResult<Node<T>> {
        let (parent, row) = self.locate(id)?;
        let len = self.child_count(parent)?;
        let announcement = self.engine.mapping.on_remove(parent, row, 1, len);

        let arena = &mut self.arena;
        self.engine
            .announce(announcement, || arena.remove(id))
            .ok_or(StoreError::NodeNotFound(id))
    }

    /// Removes members, descendants before ancestors and later rows before
    /// earlier ones so that pending positions stay valid.
    #[instrument(level = "debug", skip(self, ids))]
    pub fn remove_many(&mut self, ids: &[NodeId]) -> StoreResult<Vec<Node<T>>> {
        let ordered = self.descending(ids)?;
        let mut removed = Vec::with_capacity(ordered.len());
        for id in ordered {
            removed.push(self.remove(id)?);
        }
        Ok(removed)
    }

    /// Removes `count` consecutive children of `parent` starting at `first`.
    ///
    /// The caller has validated the range.
    pub fn remove_range(
        &mut self,
        parent: Option<NodeId>,
        first: usize,
        count: usize,
        announcement: Announcement,
    ) -> Vec<Node<T>> {
        let doomed: Vec<NodeId> = self
            .arena
            .children(parent)
            .map(|c| c.iter().skip(first).take(count).copied().collect())
            .unwrap_or_default();

        let arena = &mut self.arena;
        let mut removed = self.engine.announce(announcement, || {
            doomed
                .iter()
                .rev()
                .filter_map(|&id| arena.remove(id))
                .collect::<Vec<_>>()
        });
        removed.reverse();
        debug!("removed {} row(s) under {:?} from {}", removed.len(), parent, first);
        removed
    }

    /// Moves members under `dst_parent` so that they form one block starting
    /// at `pos` of the destination without them, in their pre-move order.
    ///
    /// Sources are handled from the last to the first; each lands right in
    /// front of the one handled before it, the first in front of the anchor
    /// (the non-moving child the block has to precede). A source already in
    /// place is skipped without notifications.
    ///
    /// `Ok(false)` when `pos` is out of range.
    #[instrument(level = "debug", skip(self, ids))]
    pub fn move_many(
        &mut self,
        ids: &[NodeId],
        dst_parent: Option<NodeId>,
        pos: isize,
    ) -> StoreResult<bool> {
        let dst_len = self.child_count(dst_parent)?;
        let ordered = self.descending(ids)?;
        if let Some(target) = dst_parent {
            if let Some(&id) = ordered
                .iter()
                .find(|&&id| self.arena.is_ancestor_or_self(id, target))
            {
                return Err(StoreError::CycleDetected {
                    node: id,
                    parent: target,
                });
            }
        }
        let Some(pos) = position::checked(pos, dst_len) else {
            debug!("move rejected: position {} outside [0, {}]", pos, dst_len);
            return Ok(false);
        };

        let moving: HashSet<NodeId> = ordered.iter().copied().collect();
        let mut anchor = self
            .arena
            .children(dst_parent)
            .unwrap_or_default()
            .iter()
            .copied()
            .filter(|id| !moving.contains(id))
            .nth(pos);

        for id in ordered {
            let (src_parent, src_row) = self.locate(id)?;
            let dst_row = match anchor {
                Some(a) => self.locate(a)?.1,
                None => self.child_count(dst_parent)?,
            };
            anchor = Some(id);

            let same_parent = src_parent == dst_parent;
            if same_parent && dst_row == src_row + 1 {
                debug!("{} already in place", id);
                continue;
            }

            let final_row = if same_parent && src_row < dst_row {
                dst_row - 1
            } else {
                dst_row
            };
            let relocation = Relocation {
                src_parent,
                src_row,
                dst_parent,
                dst_row,
                final_row,
            };
            let announcement = self.engine.mapping.on_move(&relocation);
            let arena = &mut self.arena;
            self.engine
                .announce(announcement, || arena.reparent(id, dst_parent, final_row));
            debug!("moved {}: {:?}", id, relocation);
        }
        Ok(true)
    }

    /// Moves `count` consecutive children of `src_parent`, starting at
    /// `first`, as one block to `pos` under `dst_parent`.
    ///
    /// `Ok(false)` when the source range or `pos` is out of range.
    #[instrument(level = "debug", skip(self))]
    pub fn move_range(
        &mut self,
        src_parent: Option<NodeId>,
        first: usize,
        count: usize,
        dst_parent: Option<NodeId>,
        pos: usize,
    ) -> StoreResult<bool> {
        let len = self.child_count(src_parent)?;
        self.child_count(dst_parent)?;
        let in_range = first.checked_add(count).is_some_and(|end| end <= len);
        let Ok(pos) = isize::try_from(pos) else {
            return Ok(false);
        };
        if count == 0 || !in_range {
            debug!("move rejected: rows {}+{} outside [0, {})", first, count, len);
            return Ok(false);
        }
        let ids: Vec<NodeId> = self
            .arena
            .children(src_parent)
            .unwrap_or_default()
            .iter()
            .skip(first)
            .take(count)
            .copied()
            .collect();
        self.move_many(&ids, dst_parent, pos)
    }

    /// Announces a change that does not touch the arena, e.g. a column
    /// resize, running `f` on the mapping inside the bracket.
    pub fn remap<R>(&mut self, announcement: Announcement, f: impl FnOnce(&mut M) -> R) -> R {
        let engine = &mut self.engine;
        let mapping = &mut engine.mapping;
        let notifier = &mut engine.notifier;
        let result = match announcement.bracket {
            Some(begin) => notifier.bracket(begin, || f(mapping)),
            None => f(mapping),
        };
        for change in announcement.follow_up {
            notifier.emit(change);
        }
        result
    }

    /// Replaces `data` of a member and reports the changed cell.
    pub fn set_data(&mut self, id: NodeId, data: T) -> StoreResult<T> {
        let (parent, row) = self.locate(id)?;
        let node = self
            .arena
            .node_mut(id)
            .ok_or(StoreError::NodeNotFound(id))?;
        let old = std::mem::replace(&mut node.data, data);
        let cell = self.engine.mapping.cell(row);
        self.engine.notifier.emit(Change::DataChanged {
            parent,
            top_left: cell,
            bottom_right: cell,
        });
        Ok(old)
    }

    /// Drops every node between reset notifications.
    #[instrument(level = "debug", skip(self))]
    pub fn reset(&mut self) {
        let arena = &mut self.arena;
        self.engine
            .notifier
            .bracket(Change::ResetBegin, || arena.clear());
    }

    /// Members deduplicated and sorted by descending pre-order position.
    ///
    /// Fails with `NodeNotFound` before anything is touched.
    fn descending(&self, ids: &[NodeId]) -> StoreResult<Vec<NodeId>> {
        let mut keyed = Vec::with_capacity(ids.len());
        for &id in ids.iter().unique() {
            let path = self.arena.path(id).ok_or(StoreError::NodeNotFound(id))?;
            keyed.push((path, id));
        }
        Ok(keyed
            .into_iter()
            .sorted_by(|a, b| b.0.cmp(&a.0))
            .map(|(_, id)| id)
            .collect())
    }
}

impl<M> Engine<M> {
    fn announce<R>(&mut self, announcement: Announcement, mutate: impl FnOnce() -> R) -> R {
        let result = match announcement.bracket {
            Some(begin) => self.notifier.bracket(begin, mutate),
            None => mutate(),
        };
        for change in announcement.follow_up {
            self.notifier.emit(change);
        }
        result
    }
}
