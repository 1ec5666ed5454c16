//! Integration tests for replay scripts: loading, running and rendering.

use std::fs;
use std::path::PathBuf;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use nodestore::application::{replay, ApplicationError, Script, Store, StoreKind};
use nodestore::config::Settings;
use nodestore::store::Change;
use nodestore::tree_traits::ToTermTree;
use nodestore::util::testing;

#[fixture]
fn workdir() -> TempDir {
    testing::init_test_setup();
    TempDir::new().unwrap()
}

fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

fn names(store: &Store) -> Vec<String> {
    match store {
        Store::List(list) => list.nodes().map(|n| n.name.clone()).collect(),
        Store::Table(table) => table.nodes().map(|n| n.name.clone()).collect(),
        Store::Tree(tree) => tree
            .ids()
            .filter_map(|id| tree.node(id))
            .map(|n| n.name.clone())
            .collect(),
    }
}

// ============================================================
// List scripts
// ============================================================

#[rstest]
fn given_list_script_when_replaying_then_rotates_first_to_end(workdir: TempDir) {
    let path = write(
        &workdir,
        "rotate.toml",
        r#"
kind = "list"

[[ops]]
op = "insert_many"
names = ["A", "B", "C"]

[[ops]]
op = "move"
name = "A"
"#,
    );

    let script = Script::load(&path).unwrap();
    let replayed = replay(&script, &Settings::default()).unwrap();

    assert_eq!(replayed.store.kind(), StoreKind::List);
    assert_eq!(names(&replayed.store), vec!["B", "C", "A"]);
    assert!(replayed.steps.iter().all(|s| s.applied));
    assert_eq!(
        replayed.steps[1].changes,
        vec![
            Change::MoveBegin {
                src_parent: None,
                first: 0,
                last: 0,
                dst_parent: None,
                dst_row: 3
            },
            Change::MoveEnd
        ]
    );
}

#[rstest]
fn given_unknown_name_when_replaying_then_unknown_node(workdir: TempDir) {
    let path = write(
        &workdir,
        "typo.toml",
        r#"
[[ops]]
op = "insert"
name = "A"

[[ops]]
op = "delete"
name = "a"
"#,
    );
    let script = Script::load(&path).unwrap();
    let err = replay(&script, &Settings::default()).unwrap_err();
    assert!(matches!(err, ApplicationError::UnknownNode(name) if name == "a"));
}

#[rstest]
fn given_missing_file_when_loading_then_io_error(workdir: TempDir) {
    let err = Script::load(&workdir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ApplicationError::Io { .. }));
}

// ============================================================
// Table scripts
// ============================================================

#[rstest]
fn given_table_script_without_columns_when_replaying_then_uses_settings(workdir: TempDir) {
    let path = write(
        &workdir,
        "table.toml",
        r#"
kind = "table"

[[ops]]
op = "insert_many"
names = ["a", "b", "c", "d", "e"]

[[ops]]
op = "insert_column"
column = 0

[[ops]]
op = "remove_row"
row = 1
"#,
    );
    let settings = Settings {
        table_columns: 2,
        ..Settings::default()
    };
    let replayed = replay(&Script::load(&path).unwrap(), &settings).unwrap();

    let Store::Table(table) = &replayed.store else {
        panic!("expected a table");
    };
    assert_eq!(table.columns(), 3);
    assert_eq!(table.rows(), 1);
    assert_eq!(names(&replayed.store), vec!["a", "b", "c"]);
    assert_eq!(
        replayed.steps[1].changes[0],
        Change::ColumnInsertBegin { first: 0, last: 0 }
    );
}

#[rstest]
fn given_column_op_in_list_script_when_replaying_then_script_error(workdir: TempDir) {
    let path = write(
        &workdir,
        "bad.toml",
        "[[ops]]\nop = \"insert_column\"\ncolumn = 0\n",
    );
    let err = replay(&Script::load(&path).unwrap(), &Settings::default()).unwrap_err();
    assert!(matches!(err, ApplicationError::Script { .. }));
}

// ============================================================
// Tree scripts
// ============================================================

#[rstest]
fn given_tree_script_when_replaying_then_cascade_delete_and_render(workdir: TempDir) {
    let path = write(
        &workdir,
        "tree.toml",
        r#"
kind = "tree"
headers = ["Node"]

[[ops]]
op = "insert"
name = "X"

[[ops]]
op = "insert"
name = "Y"
parent = "X"
value = "leaf"

[[ops]]
op = "insert"
name = "Z"

[[ops]]
op = "delete"
name = "X"
"#,
    );
    let replayed = replay(&Script::load(&path).unwrap(), &Settings::default()).unwrap();

    assert_eq!(names(&replayed.store), vec!["Z"]);
    let Store::Tree(tree) = &replayed.store else {
        panic!("expected a tree");
    };
    let rendered = tree.to_tree_string().to_string();
    assert_eq!(rendered.lines().next(), Some("Node"));
    assert!(rendered.contains("Z"));
    assert!(!rendered.contains("Y"));

    let ends = replayed.changes().filter(|c| c.is_end()).count();
    let begins = replayed.changes().filter(|c| c.is_begin()).count();
    assert_eq!(begins, ends);
}

#[rstest]
fn given_move_out_of_range_when_replaying_then_step_rejected(workdir: TempDir) {
    let path = write(
        &workdir,
        "range.toml",
        r#"
kind = "tree"

[[ops]]
op = "insert_many"
names = ["a", "b"]

[[ops]]
op = "move"
name = "a"
parent = "b"
pos = 4
"#,
    );
    let replayed = replay(&Script::load(&path).unwrap(), &Settings::default()).unwrap();
    assert!(!replayed.steps[1].applied);
    assert!(replayed.steps[1].changes.is_empty());
}
