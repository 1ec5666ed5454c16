//! termtree rendering of the stores.

use std::fmt::Display;

use termtree::Tree;
use tracing::instrument;

use crate::domain::{Node, NodeId};
use crate::store::{ItemModel, ListStore, TableStore, TreeStore};

pub trait ToTermTree {
    fn to_tree_string(&self) -> Tree<String>;
}

fn label<T: Display>(node: &Node<T>) -> String {
    let data = node.data.to_string();
    if data.is_empty() {
        node.name.clone()
    } else {
        format!("{}: {}", node.name, data)
    }
}

fn header_line(model: &impl ItemModel) -> String {
    (0..model.column_count())
        .map(|column| model.header(column))
        .collect::<Vec<_>>()
        .join(" | ")
}

impl<T: Display> ToTermTree for TreeStore<T> {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        fn build<T: Display>(store: &TreeStore<T>, id: NodeId) -> Option<Tree<String>> {
            let node = store.tree_node(id)?;
            let leaves = node
                .children()
                .iter()
                .filter_map(|&child| build(store, child));
            Some(Tree::new(label(&node.node)).with_leaves(leaves))
        }

        let top = self.children(None).unwrap_or_default();
        let leaves = top.iter().filter_map(|&id| build(self, id));
        Tree::new(header_line(self)).with_leaves(leaves)
    }
}

impl<T: Display> ToTermTree for ListStore<T> {
    fn to_tree_string(&self) -> Tree<String> {
        Tree::new(header_line(self)).with_leaves(self.nodes().map(label))
    }
}

impl<T: Display> ToTermTree for TableStore<T> {
    fn to_tree_string(&self) -> Tree<String> {
        let rows = (0..self.rows()).map(|row| {
            self.row(row)
                .into_iter()
                .map(label)
                .collect::<Vec<_>>()
                .join(" | ")
        });
        Tree::new(header_line(self)).with_leaves(rows)
    }
}
