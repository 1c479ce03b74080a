use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Request body of `/begin` and `/end`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameData {
    pub username: String,
    #[serde(default)]
    pub status: StatusData,
}

/// Which cups still hold a ball, as reported by the front-end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusData {
    #[serde(default)]
    pub status: Vec<bool>,
}

impl GameData {
    /// One point per cup with a ball in it.
    pub fn score(&self) -> i64 {
        self.status.status.iter().filter(|present| **present).count() as i64
    }
}

/// Whether a game is currently running. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct GameState {
    in_progress: Arc<AtomicBool>,
}

impl GameState {
    /// Create a state with no game running.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a game as running.
    pub fn begin(&self) {
        self.in_progress.store(true, Ordering::SeqCst);
    }

    /// Mark the game as over.
    pub fn finish(&self) {
        self.in_progress.store(false, Ordering::SeqCst);
    }

    /// Whether a game is running.
    pub fn in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }
}
