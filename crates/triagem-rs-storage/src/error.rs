//! Error types for durable storage.

/// Errors returned by durable stores.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The directory watcher could not be started.
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
    /// Key cannot be used as a storage name.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}
