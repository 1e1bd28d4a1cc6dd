use std::collections::HashMap as StdHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::DurableStore;
use crate::error::{AppError, AppResult};

#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("io error on {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("malformed store file {path}: {source}")]
    Json { path: String, #[source] source: serde_json::Error },
}

impl From<KvError> for AppError {
    fn from(err: KvError) -> Self {
        let code = match err {
            KvError::Io { .. } => "kv_io",
            KvError::Json { .. } => "kv_format",
        };
        AppError::Storage { code: code.into(), message: err.to_string() }
    }
}

/// Volatile store; contents vanish with the process.
#[derive(Clone, Default)]
pub struct MemoryStore {
    map: Arc<RwLock<StdHashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.map.read().len() }

    pub fn is_empty(&self) -> bool { self.map.read().is_empty() }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.map.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        self.map.write().remove(key);
        Ok(())
    }
}

/// Store persisted as one JSON object on disk.
/// The whole map is kept in memory and rewritten through a temp file on every mutation.
#[derive(Clone)]
pub struct FileStore {
    path: PathBuf,
    map: Arc<RwLock<StdHashMap<String, String>>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    /// An unreadable or corrupt file starts the store empty instead of failing.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let map = match Self::read_file(&path) {
            Ok(m) => m,
            Err(e) => {
                warn!(target: "mmms::storage", "starting with empty store: {}", e);
                StdHashMap::new()
            }
        };
        debug!(target: "mmms::storage", "opened {} with {} keys", path.display(), map.len());
        Self { path, map: Arc::new(RwLock::new(map)) }
    }

    pub fn path(&self) -> &Path { &self.path }

    fn read_file(path: &Path) -> Result<StdHashMap<String, String>, KvError> {
        if !path.exists() { return Ok(StdHashMap::new()); }
        let bytes = std::fs::read(path).map_err(|source| KvError::Io { path: path.display().to_string(), source })?;
        if bytes.is_empty() { return Ok(StdHashMap::new()); }
        serde_json::from_slice(&bytes).map_err(|source| KvError::Json { path: path.display().to_string(), source })
    }

    fn flush(&self, map: &StdHashMap<String, String>) -> Result<(), KvError> {
        let io_err = |source| KvError::Io { path: self.path.display().to_string(), source };
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() { std::fs::create_dir_all(dir).map_err(io_err)?; }
        }
        let bytes = serde_json::to_vec_pretty(map)
            .map_err(|source| KvError::Json { path: self.path.display().to_string(), source })?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.map.read().get(key).cloned())
    }

    // Memory only changes once the new snapshot is on disk.
    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut m = self.map.write();
        let mut next = m.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *m = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        let mut m = self.map.write();
        if m.contains_key(key) {
            let mut next = m.clone();
            next.remove(key);
            self.flush(&next)?;
            *m = next;
        }
        Ok(())
    }
}
