//! Application-level errors (wraps store errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::StoreError;

/// Application errors wrap store errors and add script and config context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("script error: {message}")]
    Script { message: String },

    #[error("no node named '{0}'")]
    UnknownNode(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;

impl ApplicationError {
    pub fn script(message: impl Into<String>) -> Self {
        ApplicationError::Script {
            message: message.into(),
        }
    }
}
