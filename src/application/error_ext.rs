//! Error conversion helpers for file reads

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Attach the path the I/O error happened on.
    ///
    /// # Example
    /// ```ignore
    /// let text = std::fs::read_to_string(&path).with_path(&path)?;
    /// ```
    fn with_path(self, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path(self, path: &Path) -> ApplicationResult<T> {
        self.map_err(|source| ApplicationError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
