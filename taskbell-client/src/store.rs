//! Durable last-seen counters.
//!
//! [`NotificationStore`] is the collapse point for storage failures: every
//! backend error is logged and replaced by the zero default, so callers only
//! ever see plain counts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

pub const LAST_MESSAGES_KEY: &str = "tm_last_msgs";
pub const LAST_APPROVALS_KEY: &str = "tm_last_appr";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt store: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// String key/value storage shared by every agent of the same origin.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// JSON object on disk. Every call re-reads the file so concurrent agents
/// sharing the path see each other's writes (last write wins).
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries of the file. Non-string values are kept in their JSON text
    /// form so a hand-edited `3` still reads as a count.
    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if data.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(&data)?;
        Ok(raw
            .into_iter()
            .map(|(k, v)| match v {
                serde_json::Value::String(s) => (k, s),
                other => (k, other.to_string()),
            })
            .collect())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        // An unreadable file is replaced rather than blocking every write.
        let mut map = match self.load() {
            Err(StoreError::Corrupt(e)) => {
                debug!(error=%e, path=?self.path, "discarding corrupt state file");
                BTreeMap::new()
            }
            other => other?,
        };
        map.insert(key.to_string(), value.to_string());
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;
        // Write-then-rename keeps readers from ever seeing a half-written file.
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer(&mut tmp, &map)?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

/// Process-local store, used when no durable location is available and in tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Last-seen message and approval counts on top of a [`KeyValueStore`].
pub struct NotificationStore {
    backend: Box<dyn KeyValueStore>,
}

impl NotificationStore {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Write each seed value only where its key is absent. Returns `false`
    /// when the backend could not be reached, in which case nothing was
    /// written.
    pub fn seed_if_absent(&mut self, messages: u64, approvals: u64) -> bool {
        match self.try_seed(messages, approvals) {
            Ok(()) => true,
            Err(e) => {
                debug!(error=%e, "seeding last-seen counts failed; using defaults");
                false
            }
        }
    }

    /// Persisted `(messages, approvals)`; missing or malformed values read as 0.
    pub fn read(&self) -> (u64, u64) {
        (self.read_key(LAST_MESSAGES_KEY), self.read_key(LAST_APPROVALS_KEY))
    }

    /// Best-effort overwrite of both counts.
    pub fn write(&mut self, messages: u64, approvals: u64) {
        let res = self
            .backend
            .set(LAST_MESSAGES_KEY, &messages.to_string())
            .and_then(|_| self.backend.set(LAST_APPROVALS_KEY, &approvals.to_string()));
        if let Err(e) = res {
            debug!(error=%e, "persisting last-seen counts failed");
        }
    }

    fn try_seed(&mut self, messages: u64, approvals: u64) -> Result<(), StoreError> {
        if self.backend.get(LAST_MESSAGES_KEY)?.is_none() {
            self.backend.set(LAST_MESSAGES_KEY, &messages.to_string())?;
        }
        if self.backend.get(LAST_APPROVALS_KEY)?.is_none() {
            self.backend.set(LAST_APPROVALS_KEY, &approvals.to_string())?;
        }
        Ok(())
    }

    fn read_key(&self, key: &str) -> u64 {
        match self.backend.get(key) {
            Ok(Some(v)) => parse_count(&v),
            Ok(None) => 0,
            Err(e) => {
                debug!(error=%e, key, "reading last-seen count failed");
                0
            }
        }
    }
}

fn parse_count(raw: &str) -> u64 {
    raw.trim().parse().unwrap_or(0)
}
