//! Observable containers built on the arena
//!
//! [`ListStore`], [`TableStore`] and [`TreeStore`] share one mutation engine
//! and differ only in how child positions map onto rows and cells.

pub mod engine;
pub mod list;
pub mod mapping;
pub mod model;
pub mod notify;
pub mod table;
pub mod tree;

pub use list::ListStore;
pub use mapping::{Grid, RowMapping, Rows};
pub use model::{Headers, ItemModel};
pub use notify::{Change, Notifier, StoreObserver, SubscriptionId};
pub use table::{TableStore, MAX_COLUMNS};
pub use tree::TreeStore;
