use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::{Result, StoreError};
use crate::record::ScoreRecord;
use crate::ScoreStore;

/// Volatile store; everything is lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, i64>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record, ordered by username.
    pub fn records(&self) -> Result<Vec<ScoreRecord>> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(records
            .iter()
            .map(|(name, score)| ScoreRecord::new(name.clone(), *score))
            .collect())
    }
}

impl ScoreStore for MemoryStore {
    fn get(&self, username: &str) -> Result<ScoreRecord> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        records
            .get(username)
            .map(|score| ScoreRecord::new(username, *score))
            .ok_or_else(|| StoreError::NotFound(username.to_string()))
    }

    fn exists(&self, username: &str) -> Result<bool> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(records.contains_key(username))
    }

    fn insert(&self, username: &str, score: i64) -> Result<ScoreRecord> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        if records.contains_key(username) {
            return Err(StoreError::AlreadyExists(username.to_string()));
        }
        records.insert(username.to_string(), score);
        Ok(ScoreRecord::new(username, score))
    }

    fn update(&self, username: &str, score: i64) -> Result<ScoreRecord> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        match records.get_mut(username) {
            Some(current) => {
                *current = score;
                Ok(ScoreRecord::new(username, score))
            }
            None => Err(StoreError::NotFound(username.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_duplicate() {
        let store = MemoryStore::new();
        assert_eq!(
            store.insert("george.abitbol", 42).unwrap(),
            ScoreRecord::new("george.abitbol", 42)
        );
        assert!(matches!(
            store.insert("george.abitbol", 42),
            Err(StoreError::AlreadyExists(name)) if name == "george.abitbol"
        ));
        store.insert("george.abitbol.2", 42).unwrap();
        assert_eq!(store.records().unwrap().len(), 2);
    }

    #[test]
    fn update_requires_existing_user() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.update("george.abitbol", 42),
            Err(StoreError::NotFound(_))
        ));

        store.insert("george.abitbol", 42).unwrap();
        store.update("george.abitbol", 4242).unwrap();
        assert_eq!(store.get("george.abitbol").unwrap().score, 4242);
    }

    #[test]
    fn exists_tracks_inserts() {
        let store = MemoryStore::new();
        assert!(!store.exists("george.abitbol").unwrap());
        store.insert("george.abitbol", 0).unwrap();
        assert!(store.exists("george.abitbol").unwrap());
        assert!(matches!(store.get("nobody"), Err(StoreError::NotFound(_))));
    }
}
