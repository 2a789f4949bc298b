//! Signed-in state shared with the rest of the application.
//!
//! Subscribers get a [`watch::Receiver`] and see every login and logout;
//! the message poller uses it to stop when the user signs out.

use std::sync::Arc;

use chrono::Utc;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiResponse};
use crate::session::TokenStatus;
use crate::storage::{read_json, write_json, LocalStore, USER_KEY};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id: i64,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub first_name: Option<String>,
  #[serde(default)]
  pub last_name: Option<String>,
  #[serde(default)]
  pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
  pub authenticated: bool,
  pub user: Option<User>,
}

impl AuthState {
  pub fn signed_in(user: Option<User>) -> Self {
    Self {
      authenticated: true,
      user,
    }
  }

  pub fn signed_out() -> Self {
    Self::default()
  }
}

#[derive(Deserialize)]
struct LoginResponse {
  token: String,
  #[serde(default)]
  user: Option<User>,
}

pub struct AuthStore {
  client: ApiClient,
  store: Arc<dyn LocalStore>,
  state: watch::Sender<AuthState>,
}

impl AuthStore {
  /// Restore the signed-in state from the client's session and the stored
  /// profile.
  pub fn new(client: ApiClient, store: Arc<dyn LocalStore>) -> Self {
    let initial = if client.session().is_authenticated() {
      let user = read_json::<User>(store.as_ref(), USER_KEY).unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring unreadable stored user");
        None
      });
      AuthState::signed_in(user)
    } else {
      AuthState::signed_out()
    };
    let (state, _) = watch::channel(initial);
    Self {
      client,
      store,
      state,
    }
  }

  pub fn subscribe(&self) -> watch::Receiver<AuthState> {
    self.state.subscribe()
  }

  pub fn is_authenticated(&self) -> bool {
    self.state.borrow().authenticated
  }

  pub fn current_user(&self) -> Option<User> {
    self.state.borrow().user.clone()
  }

  pub async fn login(&self, email: &str, password: &str) -> ApiResponse<Option<User>> {
    let response: ApiResponse<LoginResponse> = self
      .client
      .post("auth/login", &json!({ "email": email, "password": password }))
      .await
      .decode();

    let status = response.status();
    let login = match response.into_result() {
      Ok(login) => login,
      Err(error) => {
        warn!(status = ?status, error = %error, "Login failed");
        return ApiResponse::failure(status, error);
      }
    };

    if let Err(e) = self.persist(&login) {
      warn!(error = %e, "Failed to store session");
    }
    info!(
      user_id = ?login.user.as_ref().map(|u| u.id),
      token = %self.client.session().fingerprint().unwrap_or_default(),
      "Signed in"
    );
    self
      .state
      .send_replace(AuthState::signed_in(login.user.clone()));
    ApiResponse::success(status.unwrap_or(200), login.user)
  }

  fn persist(&self, login: &LoginResponse) -> Result<()> {
    self.client.session().set_token(&login.token)?;
    match &login.user {
      Some(user) => write_json(self.store.as_ref(), USER_KEY, user),
      None => self.store.remove(USER_KEY),
    }
  }

  /// Reload the profile of the signed-in user.
  pub async fn refresh_user(&self) -> ApiResponse<User> {
    let response: ApiResponse<User> = self.client.get_as("auth/me").await;
    if let Some(user) = response.data() {
      if let Err(e) = write_json(self.store.as_ref(), USER_KEY, user) {
        warn!(error = %e, "Failed to store user");
      }
      let user = user.clone();
      self.state.send_modify(|state| state.user = Some(user));
    }
    response
  }

  pub fn logout(&self) -> Result<()> {
    self.client.session().clear()?;
    self.store.remove(USER_KEY)?;
    self.state.send_replace(AuthState::signed_out());
    info!("Signed out");
    Ok(())
  }

  pub fn token_status(&self) -> TokenStatus {
    self.client.session().token_status(Utc::now())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::testing::MockTransport;
  use crate::api::Method;
  use crate::session::Session;
  use crate::storage::{MemoryStore, TOKEN_KEY};

  const BASE: &str = "http://kennel.test/api";

  fn setup() -> (MockTransport, Arc<MemoryStore>, AuthStore) {
    let mock = MockTransport::new();
    let store = Arc::new(MemoryStore::new());
    let session = Session::load(store.clone()).unwrap();
    let client = ApiClient::builder(BASE)
      .transport(Arc::new(mock.clone()))
      .session(session)
      .build()
      .unwrap();
    let auth = AuthStore::new(client, store.clone());
    (mock, store, auth)
  }

  #[tokio::test]
  async fn test_login_stores_token_and_notifies() {
    let (mock, store, auth) = setup();
    mock.json(
      Method::Post,
      &format!("{}/auth/login", BASE),
      200,
      json!({ "token": "abc.def", "user": { "id": 1, "email": "a@b.c" } }),
    );
    let mut rx = auth.subscribe();
    assert!(!auth.is_authenticated());

    let response = auth.login("a@b.c", "secret").await;
    assert!(response.ok());

    assert!(rx.has_changed().unwrap());
    assert!(rx.borrow_and_update().authenticated);
    assert_eq!(auth.current_user().unwrap().id, 1);
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("abc.def"));

    // Later requests carry the new token
    mock.json(Method::Get, &format!("{}/dogs", BASE), 200, json!([]));
    auth.client.get("dogs").await;
    assert_eq!(
      mock.last_request().unwrap().header("Authorization"),
      Some("Bearer abc.def")
    );
  }

  #[tokio::test]
  async fn test_failed_login_stays_signed_out() {
    let (mock, store, auth) = setup();
    mock.json(
      Method::Post,
      &format!("{}/auth/login", BASE),
      401,
      json!({ "error": "Invalid credentials" }),
    );

    let response = auth.login("a@b.c", "wrong").await;
    assert_eq!(response.error().unwrap().to_string(), "Invalid credentials");
    assert!(!auth.is_authenticated());
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
  }

  #[derive(Clone, Default)]
  struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

  impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
      self.0.lock().unwrap().extend_from_slice(buf);
      Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
      Ok(())
    }
  }

  #[tokio::test]
  async fn test_login_logs_never_contain_email() {
    let (mock, _store, auth) = setup();
    let url = format!("{}/auth/login", BASE);
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
      .with_max_level(tracing::Level::DEBUG)
      .with_ansi(false)
      .with_writer(move || writer.clone())
      .finish();
    let _default = tracing::subscriber::set_default(subscriber);

    mock.json(Method::Post, &url, 401, json!({ "error": "Invalid credentials" }));
    auth.login("breeder@kennel.test", "wrong").await;

    mock.clear(Method::Post, &url);
    mock.json(
      Method::Post,
      &url,
      200,
      json!({ "token": "abc.def", "user": { "id": 3, "email": "breeder@kennel.test" } }),
    );
    assert!(auth.login("breeder@kennel.test", "secret").await.ok());

    let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    assert!(logs.contains("Login failed"));
    assert!(logs.contains("Signed in"));
    assert!(!logs.contains("breeder@kennel.test"));
    assert!(!logs.contains("secret"));
  }

  #[test]
  fn test_restores_and_logs_out() {
    let store = Arc::new(MemoryStore::new());
    store.set(TOKEN_KEY, "tok").unwrap();
    write_json(store.as_ref(), USER_KEY, &User { id: 7, ..Default::default() }).unwrap();

    let session = Session::load(store.clone()).unwrap();
    let client = ApiClient::builder(BASE)
      .transport(Arc::new(MockTransport::new()))
      .session(session)
      .build()
      .unwrap();
    let auth = AuthStore::new(client, store.clone());
    assert!(auth.is_authenticated());
    assert_eq!(auth.current_user().map(|u| u.id), Some(7));
    assert_eq!(auth.token_status(), TokenStatus::Opaque);

    let rx = auth.subscribe();
    auth.logout().unwrap();
    assert!(!rx.borrow().authenticated);
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    assert_eq!(store.get(USER_KEY).unwrap(), None);
  }
}
