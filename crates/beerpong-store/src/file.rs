use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::record::ScoreRecord;
use crate::ScoreStore;

/// Store persisted as a JSON array of records.
///
/// The whole file is loaded on open and rewritten after every mutation, via
/// a sibling temporary file renamed over the original, so a crash mid-write
/// leaves the previous contents intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: Mutex<BTreeMap<String, i64>>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let records = match std::fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => {
                let list: Vec<ScoreRecord> =
                    serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
                        path: path.clone(),
                        source,
                    })?;
                list.into_iter().map(|r| (r.username, r.score)).collect()
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(?path, "store file missing, starting empty");
                BTreeMap::new()
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        info!(?path, users = records.len(), "database selected");

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, records: &BTreeMap<String, i64>) -> Result<()> {
        let list: Vec<ScoreRecord> = records
            .iter()
            .map(|(name, score)| ScoreRecord::new(name.clone(), *score))
            .collect();
        let json = serde_json::to_vec_pretty(&list).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, &json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = ?self.path, users = list.len(), "store persisted");
        Ok(())
    }
}

impl ScoreStore for JsonFileStore {
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
        if let Err(err) = self.persist(&records) {
            records.remove(username);
            return Err(err);
        }
        Ok(ScoreRecord::new(username, score))
    }

    fn update(&self, username: &str, score: i64) -> Result<ScoreRecord> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        let Some(previous) = records.get(username).copied() else {
            return Err(StoreError::NotFound(username.to_string()));
        };

        records.insert(username.to_string(), score);
        if let Err(err) = self.persist(&records) {
            records.insert(username.to_string(), previous);
            return Err(err);
        }
        Ok(ScoreRecord::new(username, score))
    }
}
