//! Observable list, table and tree stores over a generational arena.
//!
//! Every store owns its nodes, hands out stable [`NodeId`]s and announces
//! each structural change to its observers as a begin/end bracket.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod store;
pub mod tree_traits;
pub mod util;

pub use domain::{ModelIndex, Node, NodeId, Role, RoleValue, StoreError, StoreResult};
pub use store::{Change, ItemModel, ListStore, StoreObserver, TableStore, TreeStore};
