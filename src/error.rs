use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while scanning, indexing or rewriting a vault.
///
/// Document-level variants are collected into run reports and never abort a
/// batch. Only [`VaultError::StoreUnreadable`] and [`VaultError::Config`]
/// stop a run.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("vault directory {path:?} is unreadable: {source}")]
    StoreUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {name}: {source}")]
    Write {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("{name}: header has no closing delimiter")]
    MalformedHeader { name: String },

    #[error("invalid config {path:?}: {message}")]
    Config { path: PathBuf, message: String },
}

impl VaultError {
    /// Whether this error ends the whole run rather than a single document.
    pub fn is_fatal(&self) -> bool {
        matches!(self, VaultError::StoreUnreadable { .. } | VaultError::Config { .. })
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
