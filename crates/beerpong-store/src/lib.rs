//! User and score persistence.
//!
//! Every player is one [`ScoreRecord`] keyed by username. Storage backends
//! implement [`ScoreStore`]; the HTTP layer only sees the trait.

pub mod error;
pub mod file;
pub mod memory;
pub mod record;

pub use error::{Result, StoreError};
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use record::ScoreRecord;

/// Username-keyed score storage.
pub trait ScoreStore: Send + Sync {
    /// Fetch the record for `username`.
    ///
    /// Fails with [`StoreError::NotFound`] if there is none.
    fn get(&self, username: &str) -> Result<ScoreRecord>;

    /// Whether a record exists for `username`.
    fn exists(&self, username: &str) -> Result<bool>;

    /// Create a record.
    ///
    /// Fails with [`StoreError::AlreadyExists`] if `username` is taken.
    fn insert(&self, username: &str, score: i64) -> Result<ScoreRecord>;

    /// Overwrite the score of an existing record.
    ///
    /// Fails with [`StoreError::NotFound`] if there is none.
    fn update(&self, username: &str, score: i64) -> Result<ScoreRecord>;
}
