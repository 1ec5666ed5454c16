//! Integration tests for TableStore: grid shape, reflow and column changes.

use std::cell::RefCell;
use std::rc::Rc;

use rstest::rstest;

use nodestore::store::{Change, ItemModel, TableStore, MAX_COLUMNS};
use nodestore::util::testing;
use nodestore::{Node, NodeId};

type Log = Rc<RefCell<Vec<Change>>>;

fn table(columns: usize, names: &[&str]) -> (TableStore<u32>, Vec<NodeId>, Log) {
    testing::init_test_setup();
    let mut table = TableStore::new(columns);
    let ids = table
        .insert_many(names.iter().map(|n| Node::new(*n, 0)).collect(), -1)
        .unwrap();
    let log: Log = Rc::default();
    let sink = Rc::clone(&log);
    table.subscribe(move |change: &Change| sink.borrow_mut().push(*change));
    (table, ids, log)
}

fn names(table: &TableStore<u32>) -> Vec<&str> {
    table.nodes().map(|n| n.name.as_str()).collect()
}

fn data_changed(from: (usize, usize), to: (usize, usize)) -> Change {
    Change::DataChanged {
        parent: None,
        top_left: from,
        bottom_right: to,
    }
}

// ============================================================
// Row count
// ============================================================

#[test]
fn given_three_columns_when_appending_one_by_one_then_rows_are_1_1_1_2() {
    let (mut table, _, _) = table(3, &[]);
    let rows: Vec<usize> = ["a", "b", "c", "d"]
        .iter()
        .map(|name| {
            table.insert(Node::new(*name, 0), -1).unwrap();
            table.rows()
        })
        .collect();
    assert_eq!(rows, vec![1, 1, 1, 2]);
}

#[rstest]
#[case(1, 0, 0)]
#[case(2, 7, 4)]
#[case(3, 7, 3)]
#[case(4, 8, 2)]
fn given_n_nodes_when_counting_rows_then_ceiling_of_n_over_c(
    #[case] columns: usize,
    #[case] n: usize,
    #[case] rows: usize,
) {
    let labels: Vec<String> = (0..n).map(|i| format!("n{i}")).collect();
    let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
    let (table, _, _) = table(columns, &refs);
    assert_eq!(table.rows(), rows);
    assert_eq!(table.row_count(None), rows);
}

#[test]
fn given_partial_row_when_inserting_then_only_cells_change() {
    let (mut table, _, log) = table(3, &["a"]);
    table.insert(Node::new("b", 0), -1).unwrap();
    assert_eq!(*log.borrow(), vec![data_changed((0, 1), (0, 1))]);
}

#[test]
fn given_full_row_when_inserting_then_opens_row() {
    let (mut table, _, log) = table(2, &["a", "b"]);
    table.insert(Node::new("x", 0), 0).unwrap();
    assert_eq!(names(&table), vec!["x", "a", "b"]);
    assert_eq!(
        *log.borrow(),
        vec![
            Change::InsertBegin {
                parent: None,
                first: 1,
                last: 1
            },
            Change::InsertEnd,
            data_changed((0, 0), (0, 1)),
        ]
    );
}

#[test]
fn given_partial_row_when_inserting_batch_then_tops_off_before_new_rows() {
    let (mut table, _, log) = table(3, &["a"]);
    let ids = table
        .insert_many(
            ["b", "c", "d", "e"].iter().map(|n| Node::new(*n, 0)).collect(),
            -1,
        )
        .unwrap();

    assert_eq!(ids.len(), 4);
    assert_eq!(names(&table), vec!["a", "b", "c", "d", "e"]);
    assert_eq!(table.rows(), 2);
    assert_eq!(
        *log.borrow(),
        vec![
            data_changed((0, 1), (0, 1)),
            data_changed((0, 2), (0, 2)),
            Change::InsertBegin {
                parent: None,
                first: 1,
                last: 1
            },
            Change::InsertEnd,
        ]
    );
}

#[test]
fn given_single_cell_last_row_when_deleting_then_row_removed() {
    let (mut table, ids, log) = table(2, &["a", "b", "c"]);
    table.delete(ids[0]).unwrap();
    assert_eq!(table.rows(), 1);
    assert_eq!(
        *log.borrow(),
        vec![
            Change::RemoveBegin {
                parent: None,
                first: 1,
                last: 1
            },
            Change::RemoveEnd,
            data_changed((0, 0), (0, 1)),
        ]
    );
}

#[test]
fn given_move_when_observed_then_only_spanned_cells_change() {
    let (mut table, ids, log) = table(3, &["a", "b", "c", "d"]);
    assert!(table.move_node(ids[0], -1).unwrap());
    assert_eq!(names(&table), vec!["b", "c", "d", "a"]);
    assert_eq!(table.rows(), 2);
    assert_eq!(*log.borrow(), vec![data_changed((0, 0), (1, 0))]);
}

// ============================================================
// Cells and rows
// ============================================================

#[test]
fn given_cells_when_indexing_then_row_major() {
    let (table, ids, _) = table(2, &["a", "b", "c"]);
    assert_eq!(table.index(0, 1).unwrap().node_id(), ids[1]);
    assert_eq!(table.index(1, 0).unwrap().node_id(), ids[2]);
    assert!(table.index(1, 1).is_none());
    let visited: Vec<(usize, usize)> = table.iter().map(|i| (i.row(), i.column())).collect();
    assert_eq!(visited, vec![(0, 0), (0, 1), (1, 0)]);
}

#[test]
fn given_full_table_when_inserting_rows_then_enforces_width() {
    let (mut table, _, log) = table(2, &["a", "b"]);
    assert!(table
        .insert_row(0, vec![Node::new("x", 0), Node::new("y", 0)])
        .is_some());
    assert!(table.insert_row(1, vec![Node::new("q", 0)]).is_none());
    assert!(table.insert_row(2, vec![Node::new("z", 0)]).is_some());
    assert!(table.insert_row(3, vec![Node::new("w", 0)]).is_none());

    assert_eq!(names(&table), vec!["x", "y", "a", "b", "z"]);
    assert_eq!(
        log.borrow()[0],
        Change::InsertBegin {
            parent: None,
            first: 0,
            last: 0
        }
    );
}

#[test]
fn given_rows_when_removing_last_short_row_then_removes_its_cells() {
    let (mut table, _, _) = table(2, &["a", "b", "c"]);
    let removed = table.remove_row(1).unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].name, "c");
    assert!(table.remove_row(1).is_none());
    assert_eq!(table.row(0).len(), 2);
}

// ============================================================
// Columns
// ============================================================

#[test]
fn given_wider_grid_when_inserting_column_then_surplus_rows_removed() {
    let (mut table, _, log) = table(2, &["a", "b", "c", "d", "e"]);
    assert!(table.insert_column(2));
    assert_eq!(table.columns(), 3);
    assert_eq!(table.rows(), 2);
    assert_eq!(
        *log.borrow(),
        vec![
            Change::ColumnInsertBegin { first: 2, last: 2 },
            Change::ColumnInsertEnd,
            Change::RemoveBegin {
                parent: None,
                first: 2,
                last: 2
            },
            Change::RemoveEnd,
            data_changed((0, 0), (1, 1)),
        ]
    );
}

#[test]
fn given_narrower_grid_when_removing_column_then_filler_rows_inserted() {
    let (mut table, _, log) = table(3, &["a", "b", "c", "d", "e"]);
    assert!(table.remove_column(0));
    assert_eq!(table.columns(), 2);
    assert_eq!(table.rows(), 3);
    assert_eq!(
        *log.borrow(),
        vec![
            Change::ColumnRemoveBegin { first: 0, last: 0 },
            Change::ColumnRemoveEnd,
            Change::InsertBegin {
                parent: None,
                first: 2,
                last: 2
            },
            Change::InsertEnd,
            data_changed((0, 0), (2, 0)),
        ]
    );
}

#[test]
fn given_single_column_when_removing_it_then_rejected() {
    let (mut table, _, log) = table(1, &["a"]);
    assert!(!table.remove_column(0));
    assert!(!table.insert_columns(3, 1));
    assert_eq!(table.columns(), 1);
    assert!(log.borrow().is_empty());
}

#[test]
fn given_named_headers_when_inserting_column_then_new_column_is_numbered() {
    testing::init_test_setup();
    let mut table = TableStore::<u32>::with_headers(["Key", "Value"]);
    assert_eq!(table.columns(), 2);
    table.insert_column(1);
    assert_eq!(table.header(0), "Key");
    assert_eq!(table.header(1), "2");
    assert_eq!(table.header(2), "Value");
}

#[test]
fn given_huge_column_count_when_inserting_columns_then_rejected() {
    let (mut table, _, log) = table(2, &["a"]);
    assert!(!table.insert_columns(0, usize::MAX / 4));
    assert!(!table.insert_columns(1, usize::MAX));
    assert!(!table.remove_columns(usize::MAX, 1));
    assert_eq!(table.columns(), 2);
    assert!(log.borrow().is_empty());

    assert!(table.insert_columns(2, MAX_COLUMNS - 2));
    assert_eq!(table.columns(), MAX_COLUMNS);
    assert!(!table.insert_column(0));
}

#[test]
fn given_huge_row_count_when_changing_rows_then_rejected() {
    let (mut table, _, log) = table(2, &["a", "b", "c"]);
    assert!(table.insert_rows(2, usize::MAX, vec![Node::new("x", 0)]).is_none());
    assert!(table.remove_rows(1, usize::MAX).is_none());
    assert_eq!(table.len(), 3);
    assert!(log.borrow().is_empty());
}

// ============================================================
// Batches and data
// ============================================================

#[test]
fn given_batch_when_deleting_then_row_closes_and_cells_shift() {
    let (mut table, ids, log) = table(2, &["a", "b", "c", "d", "e"]);
    let removed = table.delete_many(&[ids[1], ids[3]]).unwrap();

    assert_eq!(
        removed.iter().map(|n| n.name.as_str()).collect::<Vec<_>>(),
        vec!["d", "b"]
    );
    assert_eq!(names(&table), vec!["a", "c", "e"]);
    assert_eq!(table.rows(), 2);
    assert_eq!(
        *log.borrow(),
        vec![
            Change::RemoveBegin {
                parent: None,
                first: 2,
                last: 2
            },
            Change::RemoveEnd,
            data_changed((1, 1), (1, 1)),
            data_changed((0, 1), (1, 0)),
        ]
    );
}

#[test]
fn given_batch_when_moving_then_only_cells_change() {
    let (mut table, ids, log) = table(2, &["a", "b", "c", "d", "e"]);
    assert!(table.move_many(&[ids[4], ids[0]], 1).unwrap());

    assert_eq!(names(&table), vec!["b", "a", "e", "c", "d"]);
    assert_eq!(table.rows(), 3);
    assert_eq!(
        *log.borrow(),
        vec![data_changed((1, 0), (2, 0)), data_changed((0, 0), (0, 1))]
    );
}

#[test]
fn given_cell_when_setting_data_then_single_cell_changes() {
    let (mut table, ids, log) = table(2, &["a", "b", "c", "d", "e"]);
    assert_eq!(table.set_data(ids[4], 7).unwrap(), 0);
    assert_eq!(table.node(ids[4]).unwrap().data, 7);
    assert_eq!(*log.borrow(), vec![data_changed((2, 0), (2, 0))]);
}
