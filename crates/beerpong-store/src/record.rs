use serde::{Deserialize, Serialize};

/// One player's stored score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub username: String,
    pub score: i64,
}

impl ScoreRecord {
    /// Create a record.
    pub fn new(username: impl Into<String>, score: i64) -> Self {
        Self {
            username: username.into(),
            score,
        }
    }
}
