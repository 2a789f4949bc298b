//! Cached list of one REST collection with loading and error state.

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

use crate::api::{ApiClient, ApiResponse};
use crate::domain::resource::{self, Resource};

/// In-memory copy of a collection, kept in step with the server by the
/// mutators.
pub struct CollectionStore<R: Resource> {
  client: ApiClient,
  items: Vec<R>,
  loading: bool,
  error: Option<String>,
  fetched_at: Option<Instant>,
  stale_time: Duration,
}

impl<R: Resource> CollectionStore<R> {
  pub fn new(client: ApiClient) -> Self {
    Self {
      client,
      items: Vec::new(),
      loading: false,
      error: None,
      fetched_at: None,
      stale_time: Duration::from_secs(60),
    }
  }

  /// After this duration the cached list is considered stale.
  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = duration;
    self
  }

  pub fn client(&self) -> &ApiClient {
    &self.client
  }

  pub fn items(&self) -> &[R] {
    &self.items
  }

  pub fn get(&self, id: i64) -> Option<&R> {
    self.items.iter().find(|item| item.id() == Some(id))
  }

  pub fn is_loading(&self) -> bool {
    self.loading
  }

  /// Message of the last failed call, cleared by the next success.
  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn is_stale(&self) -> bool {
    self
      .fetched_at
      .map(|t| t.elapsed() > self.stale_time)
      .unwrap_or(true)
  }

  /// Reload the list. On failure the previous items are kept.
  pub async fn refresh(&mut self) -> bool {
    self.loading = true;
    let response: ApiResponse<Vec<R>> = resource::list(&self.client).await;
    self.loading = false;

    match response.into_result() {
      Ok(items) => {
        debug!(collection = R::COLLECTION, count = items.len(), "Collection refreshed");
        self.items = items;
        self.fetched_at = Some(Instant::now());
        self.error = None;
        true
      }
      Err(error) => {
        self.error = Some(error.to_string());
        false
      }
    }
  }

  /// Refresh only when the cached list is stale or was never loaded.
  pub async fn ensure_fresh(&mut self) -> bool {
    if !self.is_stale() {
      return true;
    }
    self.refresh().await
  }

  pub async fn add(&mut self, record: &R) -> ApiResponse<R> {
    let response = resource::create(&self.client, record).await;
    if let Some(saved) = self.track(&response) {
      self.items.push(saved);
    }
    response
  }

  pub async fn edit(&mut self, record: &R) -> ApiResponse<R> {
    let response = resource::update(&self.client, record).await;
    if let Some(saved) = self.track(&response) {
      match self.items.iter_mut().find(|item| item.id() == saved.id()) {
        Some(existing) => *existing = saved,
        None => self.items.push(saved),
      }
    }
    response
  }

  pub async fn remove(&mut self, id: i64) -> ApiResponse<Value> {
    let response = resource::remove::<R>(&self.client, Some(id)).await;
    if self.track(&response).is_some() {
      self.items.retain(|item| item.id() != Some(id));
    }
    response
  }

  /// Record the outcome of a mutation, returning the data on success.
  fn track<T: Clone>(&mut self, response: &ApiResponse<T>) -> Option<T> {
    match response.data() {
      Some(data) => {
        self.error = None;
        Some(data.clone())
      }
      None => {
        self.error = response.error().map(|e| e.to_string());
        None
      }
    }
  }

  pub(crate) fn items_mut(&mut self) -> &mut Vec<R> {
    &mut self.items
  }

  pub(crate) fn set_error(&mut self, error: Option<String>) {
    self.error = error;
  }
}

impl<R: Resource + std::fmt::Debug> std::fmt::Debug for CollectionStore<R> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CollectionStore")
      .field("collection", &R::COLLECTION)
      .field("items", &self.items.len())
      .field("loading", &self.loading)
      .field("error", &self.error)
      .finish_non_exhaustive()
  }
}
