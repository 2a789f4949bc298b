//! Set of endpoints known to answer 404.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::url::normalize_endpoint;

/// Shared handle to the missing-endpoint set of one client.
///
/// Keys are endpoints relative to the client's base URL, as produced by
/// [`clean_endpoint`](super::url::clean_endpoint).
///
/// Entries are never removed. A server-side fix only becomes visible to a
/// freshly constructed client.
#[derive(Debug, Clone, Default)]
pub struct MissingEndpoints {
  inner: Arc<RwLock<HashSet<String>>>,
}

impl MissingEndpoints {
  pub fn new() -> Self {
    Self::default()
  }

  /// Create a set pre-populated with endpoints known to be absent.
  pub fn with_warm_up<I, S>(endpoints: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let set = Self::new();
    set.extend(endpoints);
    set
  }

  pub fn has(&self, endpoint: &str) -> bool {
    let key = normalize_endpoint(endpoint);
    match self.inner.read() {
      Ok(set) => set.contains(&key),
      Err(poisoned) => poisoned.into_inner().contains(&key),
    }
  }

  /// Mark an endpoint missing. Returns `true` if it was not already known.
  pub fn add(&self, endpoint: &str) -> bool {
    let key = normalize_endpoint(endpoint);
    let inserted = match self.inner.write() {
      Ok(mut set) => set.insert(key.clone()),
      Err(poisoned) => poisoned.into_inner().insert(key.clone()),
    };
    if inserted {
      debug!(endpoint = %key, "Marked endpoint missing");
    }
    inserted
  }

  pub fn extend<I, S>(&self, endpoints: I)
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    for endpoint in endpoints {
      self.add(endpoint.as_ref());
    }
  }

  /// Sorted copy of the current entries.
  pub fn snapshot(&self) -> Vec<String> {
    let mut entries: Vec<String> = match self.inner.read() {
      Ok(set) => set.iter().cloned().collect(),
      Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
    };
    entries.sort();
    entries
  }

  pub fn len(&self) -> usize {
    match self.inner.read() {
      Ok(set) => set.len(),
      Err(poisoned) => poisoned.into_inner().len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_add_and_has_use_cleaned_keys() {
    let missing = MissingEndpoints::new();
    assert!(!missing.has("notifications"));

    assert!(missing.add("/notifications/"));
    assert!(missing.has("notifications"));
    assert!(missing.has("/notifications"));

    // Second add is a no-op
    assert!(!missing.add("notifications"));
    assert_eq!(missing.len(), 1);
  }

  #[test]
  fn test_clones_share_state() {
    let missing = MissingEndpoints::with_warm_up(["pages"]);
    let other = missing.clone();
    other.add("dashboard/health");

    assert_eq!(
      missing.snapshot(),
      vec!["dashboard/health".to_string(), "pages".to_string()]
    );
  }
}
