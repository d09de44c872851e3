//! Persistent key-value storage and the token store built on top of it.
//!
//! The storage contract is deliberately forgiving: a missing or corrupt
//! value yields a fallback, never an error, because losing a cached token
//! must degrade to "not logged in" rather than break the client.

use crate::config::StorageKeys;
use crate::error::{ApiError, Result};
use crate::models::Principal;
use crate::session::Session;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// A persistent string key-value store.
pub trait KeyValueStore: Send + Sync {
  fn get(&self, key: &str) -> Option<String>;
  fn set(&self, key: &str, value: &str);
  fn remove(&self, key: &str);
}

/// In-memory store used in tests and as a last-resort fallback.
#[derive(Default)]
pub struct MemoryStorage {
  map: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KeyValueStore for MemoryStorage {
  fn get(&self, key: &str) -> Option<String> {
    self.map.lock().ok()?.get(key).cloned()
  }

  fn set(&self, key: &str, value: &str) {
    if let Ok(mut map) = self.map.lock() {
      map.insert(key.to_string(), value.to_string());
    }
  }

  fn remove(&self, key: &str) {
    if let Ok(mut map) = self.map.lock() {
      map.remove(key);
    }
  }
}

/// SQLite-backed key-value store.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

/// Schema for the key-value table.
const KV_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl SqliteStorage {
  /// Open the store at the given path, or the default platform location.
  pub fn open(path: Option<&Path>) -> Result<Self> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => Self::default_path()?,
    };

    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| ApiError::Storage(format!("failed to create storage directory: {}", e)))?;
    }

    let conn = Connection::open(&path).map_err(|e| {
      ApiError::Storage(format!("failed to open store at {}: {}", path.display(), e))
    })?;

    Self::from_connection(conn)
  }

  /// Open an in-memory store (used by tests).
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| ApiError::Storage(format!("failed to open in-memory store: {}", e)))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(KV_SCHEMA)
      .map_err(|e| ApiError::Storage(format!("failed to run storage migrations: {}", e)))?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn default_path() -> Result<std::path::PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| ApiError::Storage("could not determine data directory".to_string()))?;

    Ok(data_dir.join("tutorlink").join("store.db"))
  }
}

impl KeyValueStore for SqliteStorage {
  fn get(&self, key: &str) -> Option<String> {
    let conn = self.conn.lock().ok()?;
    conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .ok()
  }

  fn set(&self, key: &str, value: &str) {
    let conn = match self.conn.lock() {
      Ok(conn) => conn,
      Err(_) => return,
    };
    if let Err(e) = conn.execute(
      "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?, ?, datetime('now'))",
      params![key, value],
    ) {
      warn!("failed to persist key {}: {}", key, e);
    }
  }

  fn remove(&self, key: &str) {
    let conn = match self.conn.lock() {
      Ok(conn) => conn,
      Err(_) => return,
    };
    if let Err(e) = conn.execute("DELETE FROM kv_store WHERE key = ?", params![key]) {
      warn!("failed to remove key {}: {}", key, e);
    }
  }
}

/// Session material persisted under configured key names.
#[derive(Clone)]
pub struct TokenStore {
  store: Arc<dyn KeyValueStore>,
  keys: StorageKeys,
}

impl TokenStore {
  pub fn new(store: Arc<dyn KeyValueStore>, keys: StorageKeys) -> Self {
    Self { store, keys }
  }

  pub fn access_token(&self) -> Option<String> {
    self.store.get(&self.keys.token)
  }

  pub fn refresh_token(&self) -> Option<String> {
    self.store.get(&self.keys.refresh_token)
  }

  /// Stored principal, or `None` when absent or corrupt.
  pub fn principal(&self) -> Option<Principal> {
    let raw = self.store.get(&self.keys.principal)?;
    if raw.is_empty() || raw == "undefined" {
      return None;
    }
    match serde_json::from_str(&raw) {
      Ok(principal) => Some(principal),
      Err(e) => {
        warn!("discarding corrupt stored principal: {}", e);
        None
      }
    }
  }

  /// Rehydrate a session from whatever is stored.
  pub fn load_session(&self) -> Session {
    Session {
      access_token: self.access_token(),
      refresh_token: self.refresh_token(),
      principal: self.principal(),
    }
  }

  /// Persist the fields a session has; absent fields are left untouched.
  pub fn save_session(&self, session: &Session) {
    if let Some(token) = &session.access_token {
      self.store.set(&self.keys.token, token);
    }
    if let Some(refresh) = &session.refresh_token {
      self.store.set(&self.keys.refresh_token, refresh);
    }
    if let Some(principal) = &session.principal {
      match serde_json::to_string(principal) {
        Ok(raw) => self.store.set(&self.keys.principal, &raw),
        Err(e) => warn!("failed to serialize principal: {}", e),
      }
    }
  }

  /// Remove all session material.
  pub fn clear(&self) {
    self.store.remove(&self.keys.token);
    self.store.remove(&self.keys.refresh_token);
    self.store.remove(&self.keys.principal);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::Role;

  fn token_store(store: Arc<dyn KeyValueStore>) -> TokenStore {
    TokenStore::new(store, StorageKeys::default())
  }

  #[test]
  fn sqlite_round_trip() {
    let store = SqliteStorage::open_in_memory().unwrap();
    assert_eq!(store.get("k"), None);
    store.set("k", "v1");
    assert_eq!(store.get("k"), Some("v1".to_string()));
    store.set("k", "v2");
    assert_eq!(store.get("k"), Some("v2".to_string()));
    store.remove("k");
    assert_eq!(store.get("k"), None);
  }

  #[test]
  fn corrupt_principal_is_discarded() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStorage::new());
    store.set("tutorlink_user", "not json at all {");
    let tokens = token_store(store.clone());
    assert!(tokens.principal().is_none());

    store.set("tutorlink_user", "undefined");
    assert!(tokens.principal().is_none());
  }

  #[test]
  fn session_round_trip() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStorage::new());
    let tokens = token_store(store);

    let session = Session {
      access_token: Some("tok".to_string()),
      refresh_token: Some("ref".to_string()),
      principal: Some(Principal {
        id: 7,
        name: "Mika".to_string(),
        email: "mika@example.com".to_string(),
        role: Role::User,
        profile_image: None,
      }),
    };
    tokens.save_session(&session);

    let loaded = tokens.load_session();
    assert_eq!(loaded.access_token.as_deref(), Some("tok"));
    assert_eq!(loaded.refresh_token.as_deref(), Some("ref"));
    assert_eq!(loaded.principal.unwrap().name, "Mika");

    tokens.clear();
    let cleared = tokens.load_session();
    assert!(cleared.access_token.is_none());
    assert!(cleared.principal.is_none());
  }
}
