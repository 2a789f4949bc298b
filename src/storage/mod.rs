//! Local key-value storage.
//!
//! Holds the session token, the customer shadow records and the pending-write
//! log. Values are strings; JSON values go through [`read_json`] and
//! [`write_json`].

mod memory;
mod queue;
mod sqlite;

pub use memory::MemoryStore;
pub use queue::{OfflineQueue, PendingOp, PendingWrite};
pub use sqlite::SqliteStore;

use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Serialize};

/// Key holding the bearer token.
pub const TOKEN_KEY: &str = "token";
/// Key holding the signed-in user profile.
pub const USER_KEY: &str = "user";
/// Key holding the customer shadow records.
pub const CUSTOMERS_KEY: &str = "customers";
/// Key holding the pending-write log.
pub const PENDING_WRITES_KEY: &str = "pending_writes";

/// Trait for local storage backends.
pub trait LocalStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>>;

  fn set(&self, key: &str, value: &str) -> Result<()>;

  fn remove(&self, key: &str) -> Result<()>;

  /// All keys, sorted.
  fn keys(&self) -> Result<Vec<String>>;
}

/// Read and deserialize a JSON value.
pub fn read_json<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Result<Option<T>> {
  match store.get(key)? {
    Some(raw) => serde_json::from_str(&raw)
      .map(Some)
      .map_err(|e| eyre!("Failed to parse stored value {}: {}", key, e)),
    None => Ok(None),
  }
}

/// Serialize and store a JSON value.
pub fn write_json<T: Serialize + ?Sized>(store: &dyn LocalStore, key: &str, value: &T) -> Result<()> {
  let raw =
    serde_json::to_string(value).map_err(|e| eyre!("Failed to serialize {}: {}", key, e))?;
  store.set(key, &raw)
}
