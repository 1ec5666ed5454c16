//! Domain layer: nodes, the arena and positional arithmetic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod error;
pub mod index;
pub mod node;
pub mod position;

pub use arena::{TreeArena, TreeNode};
pub use error::{StoreError, StoreResult};
pub use index::{ModelIndex, Role, RoleValue};
pub use node::{Node, NodeId};
