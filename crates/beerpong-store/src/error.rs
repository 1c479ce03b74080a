use std::path::PathBuf;

/// Errors that can occur in score storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A record already exists for the username.
    #[error("user {0:?} already exists")]
    AlreadyExists(String),

    /// No record exists for the username.
    #[error("user {0:?} not found")]
    NotFound(String),

    /// Reading or writing the backing file failed.
    #[error("store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The backing file is not a valid record list.
    #[error("store file {path} is corrupt: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Another thread panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;
