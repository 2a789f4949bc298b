//! Auth session: the bearer token, read from local storage once and shared
//! by every request the client makes.

use std::sync::{Arc, RwLock};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::storage::{LocalStore, TOKEN_KEY};

/// Outcome of inspecting the stored token's `exp` claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TokenStatus {
  Missing,
  /// Not a JWT, or a JWT whose payload could not be decoded
  Opaque,
  /// JWT without an `exp` claim
  NoExpiry,
  Valid { expires_at: DateTime<Utc> },
  Expired { expires_at: DateTime<Utc> },
}

#[derive(Clone, Default)]
pub struct Session {
  token: Arc<RwLock<Option<String>>>,
  store: Option<Arc<dyn LocalStore>>,
}

impl Session {
  /// Session without a token and without persistence.
  pub fn anonymous() -> Self {
    Self::default()
  }

  /// Session with a fixed token, not persisted.
  pub fn with_token(token: impl Into<String>) -> Self {
    let session = Self::default();
    session.replace(Some(token.into()));
    session
  }

  /// Load the token from local storage.
  pub fn load(store: Arc<dyn LocalStore>) -> Result<Self> {
    let token = store.get(TOKEN_KEY)?.filter(|t| !t.is_empty());
    let session = Self {
      token: Arc::new(RwLock::new(token)),
      store: Some(store),
    };
    if let Some(fingerprint) = session.fingerprint() {
      debug!(token = %fingerprint, "Loaded session token");
    }
    Ok(session)
  }

  pub fn token(&self) -> Option<String> {
    match self.token.read() {
      Ok(token) => token.clone(),
      Err(poisoned) => poisoned.into_inner().clone(),
    }
  }

  pub fn is_authenticated(&self) -> bool {
    self.token().is_some()
  }

  /// `Authorization` header value, if a token is present.
  pub fn authorization(&self) -> Option<String> {
    self.token().map(|t| format!("Bearer {}", t))
  }

  /// Replace the token and persist it.
  pub fn set_token(&self, token: &str) -> Result<()> {
    if token.is_empty() {
      return self.clear();
    }
    if let Some(store) = &self.store {
      store.set(TOKEN_KEY, token)?;
    }
    self.replace(Some(token.to_string()));
    Ok(())
  }

  /// Forget the token, in memory and in storage.
  pub fn clear(&self) -> Result<()> {
    if let Some(store) = &self.store {
      store.remove(TOKEN_KEY)?;
    }
    self.replace(None);
    Ok(())
  }

  fn replace(&self, token: Option<String>) {
    match self.token.write() {
      Ok(mut slot) => *slot = token,
      Err(poisoned) => *poisoned.into_inner() = token,
    }
  }

  /// Short hash of the token, safe to log.
  pub fn fingerprint(&self) -> Option<String> {
    self.token().map(|t| {
      let digest = Sha256::digest(t.as_bytes());
      hex::encode(&digest[..6])
    })
  }

  /// Decode the token's `exp` claim and compare it with `now`.
  ///
  /// The signature is not verified; this is a diagnostic only.
  pub fn token_status(&self, now: DateTime<Utc>) -> TokenStatus {
    let token = match self.token() {
      Some(token) => token,
      None => return TokenStatus::Missing,
    };
    let claims = match decode_claims(&token) {
      Some(claims) => claims,
      None => return TokenStatus::Opaque,
    };
    let expires_at = match claims
      .get("exp")
      .and_then(Value::as_i64)
      .and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0))
    {
      Some(expires_at) => expires_at,
      None => return TokenStatus::NoExpiry,
    };

    if expires_at <= now {
      TokenStatus::Expired { expires_at }
    } else {
      TokenStatus::Valid { expires_at }
    }
  }
}

impl std::fmt::Debug for Session {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Session")
      .field("token", &self.fingerprint())
      .field("persistent", &self.store.is_some())
      .finish()
  }
}

/// Payload segment of a JWT as JSON.
fn decode_claims(token: &str) -> Option<Value> {
  let mut parts = token.split('.');
  let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
  let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
  serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::storage::MemoryStore;
  use serde_json::json;

  fn jwt(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
  }

  #[test]
  fn test_load_reads_token_once() {
    let store: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
    store.set(TOKEN_KEY, "abc").unwrap();

    let session = Session::load(store.clone()).unwrap();
    assert_eq!(session.authorization(), Some("Bearer abc".to_string()));

    // Later storage edits are not picked up by the session
    store.set(TOKEN_KEY, "changed").unwrap();
    assert_eq!(session.token(), Some("abc".to_string()));
  }

  #[test]
  fn test_set_and_clear_persist() {
    let store: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
    let session = Session::load(store.clone()).unwrap();
    assert!(!session.is_authenticated());
    assert_eq!(session.authorization(), None);

    session.set_token("xyz").unwrap();
    assert_eq!(store.get(TOKEN_KEY).unwrap(), Some("xyz".to_string()));

    session.clear().unwrap();
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    assert!(!session.is_authenticated());
  }

  #[test]
  fn test_token_status() {
    let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();

    assert_eq!(Session::anonymous().token_status(now), TokenStatus::Missing);
    assert_eq!(Session::with_token("opaque").token_status(now), TokenStatus::Opaque);
    assert_eq!(
      Session::with_token(jwt(json!({ "sub": 1 }))).token_status(now),
      TokenStatus::NoExpiry
    );

    let expired = Session::with_token(jwt(json!({ "exp": 1_600_000_000 })));
    assert!(matches!(expired.token_status(now), TokenStatus::Expired { .. }));

    let valid = Session::with_token(jwt(json!({ "exp": 1_800_000_000 })));
    assert!(matches!(valid.token_status(now), TokenStatus::Valid { .. }));
  }

  #[test]
  fn test_debug_hides_token() {
    let session = Session::with_token("secret-token");
    let rendered = format!("{:?}", session);
    assert!(!rendered.contains("secret-token"));
  }
}
