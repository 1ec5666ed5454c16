//! Application layer: replay scripts and their runner
//!
//! This layer drives the stores and owns file I/O for scripts and settings.

pub mod error;
pub mod error_ext;
pub mod script;

pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
pub use script::{replay, Op, Replay, Runner, Script, Step, Store, StoreKind};
