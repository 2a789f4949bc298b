//! Pending-write log for writes made while the server was unreachable.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{read_json, write_json, LocalStore, PENDING_WRITES_KEY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PendingOp {
  Create,
  Update { id: i64 },
  Delete { id: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingWrite {
  pub seq: u64,
  /// Resource collection, e.g. `customers`
  pub collection: String,
  #[serde(flatten)]
  pub op: PendingOp,
  /// Id the record carries in the shadow store
  pub local_id: i64,
  #[serde(default)]
  pub payload: Value,
  pub queued_at: DateTime<Utc>,
}

/// Ordered log of writes waiting to be replayed against the server.
///
/// Clones share one lock, so a read-modify-write of the log never
/// interleaves with another clone's.
#[derive(Clone)]
pub struct OfflineQueue {
  store: Arc<dyn LocalStore>,
  lock: Arc<Mutex<()>>,
}

impl OfflineQueue {
  pub fn new(store: Arc<dyn LocalStore>) -> Self {
    Self {
      store,
      lock: Arc::new(Mutex::new(())),
    }
  }

  fn guard(&self) -> Result<MutexGuard<'_, ()>> {
    self
      .lock
      .lock()
      .map_err(|e| eyre!("Pending-write lock poisoned: {}", e))
  }

  pub fn list(&self) -> Result<Vec<PendingWrite>> {
    Ok(read_json(self.store.as_ref(), PENDING_WRITES_KEY)?.unwrap_or_default())
  }

  pub fn len(&self) -> Result<usize> {
    Ok(self.list()?.len())
  }

  pub fn is_empty(&self) -> Result<bool> {
    Ok(self.list()?.is_empty())
  }

  pub fn push(
    &self,
    collection: &str,
    op: PendingOp,
    local_id: i64,
    payload: Value,
  ) -> Result<PendingWrite> {
    let _guard = self.guard()?;
    let mut entries = self.list()?;
    let seq = entries.iter().map(|e| e.seq).max().map_or(1, |s| s + 1);
    let entry = PendingWrite {
      seq,
      collection: collection.to_string(),
      op,
      local_id,
      payload,
      queued_at: Utc::now(),
    };
    entries.push(entry.clone());
    write_json(self.store.as_ref(), PENDING_WRITES_KEY, &entries)?;
    Ok(entry)
  }

  /// Drop an entry once it has been replayed (or rejected for good).
  pub fn remove(&self, seq: u64) -> Result<()> {
    let _guard = self.guard()?;
    let mut entries = self.list()?;
    entries.retain(|e| e.seq != seq);
    write_json(self.store.as_ref(), PENDING_WRITES_KEY, &entries)
  }

  /// Point later entries at the id the server assigned to a replayed create.
  pub fn rewrite_id(&self, collection: &str, local_id: i64, server_id: i64) -> Result<()> {
    let _guard = self.guard()?;
    let mut entries = self.list()?;
    for entry in entries
      .iter_mut()
      .filter(|e| e.collection == collection && e.local_id == local_id)
    {
      entry.local_id = server_id;
      match &mut entry.op {
        PendingOp::Update { id } | PendingOp::Delete { id } => *id = server_id,
        PendingOp::Create => {}
      }
    }
    write_json(self.store.as_ref(), PENDING_WRITES_KEY, &entries)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::storage::MemoryStore;
  use serde_json::json;

  #[test]
  fn test_push_assigns_increasing_seq() {
    let queue = OfflineQueue::new(Arc::new(MemoryStore::new()));
    let first = queue
      .push("customers", PendingOp::Create, 10, json!({ "name": "A" }))
      .unwrap();
    let second = queue
      .push("customers", PendingOp::Update { id: 10 }, 10, json!({ "name": "B" }))
      .unwrap();

    assert_eq!(first.seq, 1);
    assert_eq!(second.seq, 2);
    assert_eq!(queue.len().unwrap(), 2);

    queue.remove(1).unwrap();
    assert_eq!(queue.list().unwrap(), vec![second]);
  }

  #[test]
  fn test_rewrite_id_updates_later_ops() {
    let queue = OfflineQueue::new(Arc::new(MemoryStore::new()));
    queue.push("customers", PendingOp::Create, 10, json!({})).unwrap();
    queue
      .push("customers", PendingOp::Delete { id: 10 }, 10, Value::Null)
      .unwrap();

    queue.rewrite_id("customers", 10, 501).unwrap();

    let entries = queue.list().unwrap();
    assert_eq!(entries[1].op, PendingOp::Delete { id: 501 });
    assert_eq!(entries[1].local_id, 501);
  }

  #[test]
  fn test_concurrent_writers_keep_every_entry() {
    let queue = OfflineQueue::new(Arc::new(MemoryStore::new()));
    let seed = queue.push("customers", PendingOp::Create, 1, json!({})).unwrap();

    let writers: Vec<_> = (0..8)
      .map(|i| {
        let queue = queue.clone();
        std::thread::spawn(move || {
          for n in 0..25 {
            let id = 100 + i * 25 + n;
            queue
              .push("customers", PendingOp::Update { id }, id, json!({}))
              .unwrap();
          }
        })
      })
      .collect();
    let remover = {
      let queue = queue.clone();
      std::thread::spawn(move || queue.remove(seed.seq).unwrap())
    };

    for writer in writers {
      writer.join().unwrap();
    }
    remover.join().unwrap();

    let entries = queue.list().unwrap();
    assert_eq!(entries.len(), 200);
    assert!(entries.iter().all(|e| e.local_id != seed.local_id));
  }
}
