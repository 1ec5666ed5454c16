//! Replay scripts: a TOML description of a store and the operations to run
//! against it.
//!
//! ```toml
//! kind = "tree"
//!
//! [[ops]]
//! op = "insert"
//! name = "X"
//!
//! [[ops]]
//! op = "insert"
//! name = "Y"
//! parent = "X"
//! ```
//!
//! Nodes are addressed by name; the first node with that name (pre-order for
//! trees) is the one meant.

use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{Node, NodeId};
use crate::store::{Change, Headers, ListStore, TableStore, TreeStore, MAX_COLUMNS};

/// Which store a script drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    List,
    Table,
    Tree,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreKind::List => "list",
            StoreKind::Table => "table",
            StoreKind::Tree => "tree",
        };
        write!(f, "{}", name)
    }
}

fn append() -> isize {
    -1
}

fn one() -> usize {
    1
}

/// One scripted operation, tagged by `op`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Op {
    Insert {
        name: String,
        #[serde(default)]
        value: String,
        parent: Option<String>,
        #[serde(default = "append")]
        pos: isize,
    },
    InsertMany {
        names: Vec<String>,
        parent: Option<String>,
        #[serde(default = "append")]
        pos: isize,
    },
    Delete {
        name: String,
    },
    DeleteMany {
        names: Vec<String>,
    },
    Move {
        name: String,
        parent: Option<String>,
        #[serde(default = "append")]
        pos: isize,
    },
    MoveMany {
        names: Vec<String>,
        parent: Option<String>,
        #[serde(default = "append")]
        pos: isize,
    },
    Clear,
    InsertColumn {
        column: usize,
        #[serde(default = "one")]
        count: usize,
    },
    RemoveColumn {
        column: usize,
        #[serde(default = "one")]
        count: usize,
    },
    RemoveRow {
        row: usize,
        #[serde(default = "one")]
        count: usize,
    },
}

impl Op {
    pub fn label(&self) -> &'static str {
        match self {
            Op::Insert { .. } => "insert",
            Op::InsertMany { .. } => "insert_many",
            Op::Delete { .. } => "delete",
            Op::DeleteMany { .. } => "delete_many",
            Op::Move { .. } => "move",
            Op::MoveMany { .. } => "move_many",
            Op::Clear => "clear",
            Op::InsertColumn { .. } => "insert_column",
            Op::RemoveColumn { .. } => "remove_column",
            Op::RemoveRow { .. } => "remove_row",
        }
    }

    fn parent(&self) -> Option<&str> {
        match self {
            Op::Insert { parent, .. }
            | Op::InsertMany { parent, .. }
            | Op::Move { parent, .. }
            | Op::MoveMany { parent, .. } => parent.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Insert { name, pos, .. } | Op::Move { name, pos, .. } => {
                write!(f, "{} {} @{}", self.label(), name, pos)?
            }
            Op::InsertMany { names, pos, .. } | Op::MoveMany { names, pos, .. } => {
                write!(f, "{} [{}] @{}", self.label(), names.join(", "), pos)?
            }
            Op::Delete { name } => write!(f, "{} {}", self.label(), name)?,
            Op::DeleteMany { names } => write!(f, "{} [{}]", self.label(), names.join(", "))?,
            Op::Clear => write!(f, "{}", self.label())?,
            Op::InsertColumn { column, count } | Op::RemoveColumn { column, count } => {
                write!(f, "{} {} x{}", self.label(), column, count)?
            }
            Op::RemoveRow { row, count } => write!(f, "{} {} x{}", self.label(), row, count)?,
        }
        match self.parent() {
            Some(parent) => write!(f, " under {}", parent),
            None => Ok(()),
        }
    }
}

/// A store description plus the operations to replay against it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    #[serde(default)]
    pub kind: StoreKind,
    /// Table width; defaults to the header count, then to the settings
    pub columns: Option<usize>,
    pub headers: Option<Vec<String>>,
    #[serde(default)]
    pub ops: Vec<Op>,
}

impl FromStr for Script {
    type Err = ApplicationError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        toml::from_str(text).map_err(|e| ApplicationError::script(e.to_string()))
    }
}

impl Script {
    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> ApplicationResult<Self> {
        let text = std::fs::read_to_string(path).with_path(path)?;
        let script: Script = text.parse()?;
        debug!("loaded {} script with {} op(s)", script.kind, script.ops.len());
        Ok(script)
    }
}

/// The store a script builds.
#[derive(Debug)]
pub enum Store {
    List(ListStore<String>),
    Table(TableStore<String>),
    Tree(TreeStore<String>),
}

impl Store {
    pub fn kind(&self) -> StoreKind {
        match self {
            Store::List(_) => StoreKind::List,
            Store::Table(_) => StoreKind::Table,
            Store::Tree(_) => StoreKind::Tree,
        }
    }

    fn record(&mut self, log: &Rc<RefCell<Vec<Change>>>) {
        let sink = Rc::clone(log);
        let observer = move |change: &Change| sink.borrow_mut().push(*change);
        match self {
            Store::List(list) => list.subscribe(observer),
            Store::Table(table) => table.subscribe(observer),
            Store::Tree(tree) => tree.subscribe(observer),
        };
    }
}

/// Outcome of one replayed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub op: Op,
    /// False when the store rejected the request without mutating
    pub applied: bool,
    pub changes: Vec<Change>,
}

/// Everything a replay produced.
#[derive(Debug)]
pub struct Replay {
    pub store: Store,
    pub steps: Vec<Step>,
}

impl Replay {
    pub fn changes(&self) -> impl Iterator<Item = &Change> + '_ {
        self.steps.iter().flat_map(|step| step.changes.iter())
    }
}

/// Drives one store through scripted operations, recording every
/// notification it emits.
#[derive(Debug)]
pub struct Runner {
    store: Store,
    log: Rc<RefCell<Vec<Change>>>,
}

impl Runner {
    pub fn new(script: &Script, settings: &Settings) -> ApplicationResult<Self> {
        let numbered = settings.numbered_headers;
        let mut store = match script.kind {
            StoreKind::List => {
                let mut list = ListStore::new();
                let names = script
                    .headers
                    .clone()
                    .unwrap_or_else(|| vec![settings.list_header.clone()]);
                list.set_headers(Headers::new(names).numbered(numbered));
                Store::List(list)
            }
            StoreKind::Table => {
                let columns = script
                    .columns
                    .or_else(|| script.headers.as_ref().map(Vec::len))
                    .unwrap_or(settings.table_columns);
                if columns == 0 {
                    return Err(ApplicationError::script("a table needs at least one column"));
                }
                if columns > MAX_COLUMNS {
                    return Err(ApplicationError::script(format!(
                        "a table holds at most {} columns",
                        MAX_COLUMNS
                    )));
                }
                let mut table = TableStore::new(columns);
                let names = script.headers.clone().unwrap_or_default();
                table.set_headers(Headers::new(names).numbered(numbered));
                Store::Table(table)
            }
            StoreKind::Tree => {
                let mut tree = TreeStore::new();
                let names = script
                    .headers
                    .clone()
                    .unwrap_or_else(|| settings.tree_headers.clone());
                tree.set_headers(Headers::new(names).numbered(numbered));
                Store::Tree(tree)
            }
        };

        let log = Rc::default();
        store.record(&log);
        Ok(Self { store, log })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Applies one operation and collects the notifications it caused.
    #[instrument(level = "debug", skip(self), fields(op = op.label()))]
    pub fn run(&mut self, op: &Op) -> ApplicationResult<Step> {
        let applied = match &mut self.store {
            Store::List(list) => apply_list(list, op)?,
            Store::Table(table) => apply_table(table, op)?,
            Store::Tree(tree) => apply_tree(tree, op)?,
        };
        let changes = self.log.take();
        if !applied {
            info!("rejected: {}", op);
        }
        Ok(Step {
            op: op.clone(),
            applied,
            changes,
        })
    }

    pub fn finish(self, steps: Vec<Step>) -> Replay {
        Replay {
            store: self.store,
            steps,
        }
    }
}

/// Builds the store of `script` and replays every operation, stopping at
/// the first error.
#[instrument(level = "debug", skip_all, fields(kind = %script.kind, ops = script.ops.len()))]
pub fn replay(script: &Script, settings: &Settings) -> ApplicationResult<Replay> {
    let mut runner = Runner::new(script, settings)?;
    let mut steps = Vec::with_capacity(script.ops.len());
    for op in &script.ops {
        steps.push(runner.run(op)?);
    }
    Ok(runner.finish(steps))
}

fn resolve(found: Option<NodeId>, name: &str) -> ApplicationResult<NodeId> {
    found.ok_or_else(|| ApplicationError::UnknownNode(name.to_string()))
}

fn resolve_all(
    names: &[String],
    find: impl Fn(&str) -> Option<NodeId>,
) -> ApplicationResult<Vec<NodeId>> {
    names.iter().map(|name| resolve(find(name), name)).collect()
}

fn nodes(names: &[String]) -> Vec<Node<String>> {
    names.iter().map(|name| Node::named(name.as_str())).collect()
}

fn unsupported(op: &Op, kind: StoreKind) -> ApplicationError {
    ApplicationError::script(format!("'{}' is not supported by a {} store", op.label(), kind))
}

/// Only trees have parents to address.
fn flat_only(op: &Op, kind: StoreKind) -> ApplicationResult<()> {
    match op.parent() {
        Some(_) => Err(ApplicationError::script(format!(
            "'{}' names a parent, but a {} store has none",
            op.label(),
            kind
        ))),
        None => Ok(()),
    }
}

fn apply_list(list: &mut ListStore<String>, op: &Op) -> ApplicationResult<bool> {
    flat_only(op, StoreKind::List)?;
    let find = |name: &str| list.find_by_name(name);
    Ok(match op {
        Op::Insert {
            name, value, pos, ..
        } => list.insert(Node::new(name.as_str(), value.clone()), *pos).is_some(),
        Op::InsertMany { names, pos, .. } => list.insert_many(nodes(names), *pos).is_some(),
        Op::Delete { name } => {
            let id = resolve(find(name), name)?;
            list.delete(id)?;
            true
        }
        Op::DeleteMany { names } => {
            let ids = resolve_all(names, find)?;
            list.delete_many(&ids)?;
            true
        }
        Op::Move { name, pos, .. } => {
            let id = resolve(find(name), name)?;
            list.move_node(id, *pos)?
        }
        Op::MoveMany { names, pos, .. } => {
            let ids = resolve_all(names, find)?;
            list.move_many(&ids, *pos)?
        }
        Op::Clear => {
            list.clear();
            true
        }
        Op::RemoveRow { row, count } => list.remove_rows(*row, *count).is_some(),
        Op::InsertColumn { .. } | Op::RemoveColumn { .. } => {
            return Err(unsupported(op, StoreKind::List))
        }
    })
}

fn apply_table(table: &mut TableStore<String>, op: &Op) -> ApplicationResult<bool> {
    flat_only(op, StoreKind::Table)?;
    let find = |name: &str| table.find_by_name(name);
    Ok(match op {
        Op::Insert {
            name, value, pos, ..
        } => table.insert(Node::new(name.as_str(), value.clone()), *pos).is_some(),
        Op::InsertMany { names, pos, .. } => table.insert_many(nodes(names), *pos).is_some(),
        Op::Delete { name } => {
            let id = resolve(find(name), name)?;
            table.delete(id)?;
            true
        }
        Op::DeleteMany { names } => {
            let ids = resolve_all(names, find)?;
            table.delete_many(&ids)?;
            true
        }
        Op::Move { name, pos, .. } => {
            let id = resolve(find(name), name)?;
            table.move_node(id, *pos)?
        }
        Op::MoveMany { names, pos, .. } => {
            let ids = resolve_all(names, find)?;
            table.move_many(&ids, *pos)?
        }
        Op::Clear => {
            table.clear();
            true
        }
        Op::InsertColumn { column, count } => table.insert_columns(*column, *count),
        Op::RemoveColumn { column, count } => table.remove_columns(*column, *count),
        Op::RemoveRow { row, count } => table.remove_rows(*row, *count).is_some(),
    })
}

fn apply_tree(tree: &mut TreeStore<String>, op: &Op) -> ApplicationResult<bool> {
    let find = |name: &str| tree.find_by_name(name);
    let parent = op
        .parent()
        .map(|name| resolve(find(name), name))
        .transpose()?;
    Ok(match op {
        Op::Insert {
            name, value, pos, ..
        } => tree
            .insert(Node::new(name.as_str(), value.clone()), parent, *pos)?
            .is_some(),
        Op::InsertMany { names, pos, .. } => {
            tree.insert_many(nodes(names), parent, *pos)?.is_some()
        }
        Op::Delete { name } => {
            let id = resolve(find(name), name)?;
            tree.delete(id)?;
            true
        }
        Op::DeleteMany { names } => {
            let ids = resolve_all(names, find)?;
            tree.delete_many(&ids)?;
            true
        }
        Op::Move { name, pos, .. } => {
            let id = resolve(find(name), name)?;
            tree.move_node(id, parent, *pos)?
        }
        Op::MoveMany { names, pos, .. } => {
            let ids = resolve_all(names, find)?;
            tree.move_many(&ids, parent, *pos)?
        }
        Op::Clear => {
            tree.clear();
            true
        }
        Op::InsertColumn { .. } | Op::RemoveColumn { .. } | Op::RemoveRow { .. } => {
            return Err(unsupported(op, StoreKind::Tree))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StoreError;

    fn run(text: &str) -> ApplicationResult<Replay> {
        let script: Script = text.parse()?;
        replay(&script, &Settings::default())
    }

    #[test]
    fn given_tagged_ops_when_parsing_then_defaults_apply() {
        let script: Script = r#"
            kind = "table"
            columns = 2

            [[ops]]
            op = "insert"
            name = "a"

            [[ops]]
            op = "remove_column"
            column = 1
        "#
        .parse()
        .unwrap();
        assert_eq!(script.kind, StoreKind::Table);
        assert_eq!(
            script.ops,
            vec![
                Op::Insert {
                    name: "a".into(),
                    value: String::new(),
                    parent: None,
                    pos: -1
                },
                Op::RemoveColumn {
                    column: 1,
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn given_unknown_key_when_parsing_then_script_error() {
        let err = "kind = \"list\"\nrows = 3\n".parse::<Script>().unwrap_err();
        assert!(matches!(err, ApplicationError::Script { .. }));
    }

    #[test]
    fn given_misspelled_op_key_when_parsing_then_script_error() {
        let err = "[[ops]]\nop = \"insert\"\nname = \"a\"\nparnet = \"x\"\n"
            .parse::<Script>()
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Script { .. }));
    }

    #[test]
    fn given_huge_column_count_when_replaying_then_step_rejected() {
        let replay = run(
            r#"
            kind = "table"
            columns = 2
            [[ops]]
            op = "insert"
            name = "a"
            [[ops]]
            op = "insert_column"
            column = 0
            count = 9223372036854775807
            "#,
        )
        .unwrap();
        assert!(!replay.steps[1].applied);
        assert!(replay.steps[1].changes.is_empty());
        let Store::Table(table) = &replay.store else {
            panic!("expected a table");
        };
        assert_eq!(table.columns(), 2);
    }

    #[test]
    fn given_table_wider_than_limit_when_replaying_then_script_error() {
        let err = run(&format!("kind = \"table\"\ncolumns = {}\n", MAX_COLUMNS + 1))
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Script { .. }));
    }

    #[test]
    fn given_out_of_range_insert_when_replaying_then_step_rejected() {
        let replay = run(
            r#"
            [[ops]]
            op = "insert"
            name = "a"
            pos = 5
            "#,
        )
        .unwrap();
        assert!(!replay.steps[0].applied);
        assert!(replay.steps[0].changes.is_empty());
    }

    #[test]
    fn given_move_under_own_child_when_replaying_then_store_error() {
        let err = run(
            r#"
            kind = "tree"
            [[ops]]
            op = "insert"
            name = "a"
            [[ops]]
            op = "insert"
            name = "b"
            parent = "a"
            [[ops]]
            op = "move"
            name = "a"
            parent = "b"
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Store(StoreError::CycleDetected { .. })
        ));
    }

    #[test]
    fn given_parent_in_list_script_when_replaying_then_script_error() {
        let err = run(
            r#"
            [[ops]]
            op = "insert"
            name = "a"
            parent = "x"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ApplicationError::Script { .. }));
    }
}
