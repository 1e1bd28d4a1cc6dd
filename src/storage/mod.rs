//! Durable key-value storage consumed by the session store.
//! Reads and writes are single-key and atomic; no transactions span keys.

pub mod kv;

pub use kv::{FileStore, KvError, MemoryStore};

use std::sync::Arc;

use crate::error::AppResult;

/// Key holding the opaque session token.
pub const TOKEN_KEY: &str = "auth_token";
/// Key holding the serialized identity.
pub const IDENTITY_KEY: &str = "user";

pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove(&self, key: &str) -> AppResult<()>;
}

pub type SharedStore = Arc<dyn DurableStore>;
