//! Customer API with a local fallback.
//!
//! When the server cannot be reached, reads are served from the shadow copy
//! in local storage and writes land there too, each one recorded in the
//! pending-write log. [`CustomerApi::sync_pending`] replays that log once the
//! server answers again. HTTP errors never trigger the fallback, only
//! transport failures do.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::resource::{self, item_endpoint, Resource};
use crate::api::{sanitize_api_data, ApiClient, ApiResponse, DataSource};
use crate::storage::{
  read_json, write_json, LocalStore, OfflineQueue, PendingOp, PendingWrite, CUSTOMERS_KEY,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<i64>,
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub last_name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub address: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub city: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub state: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub zip: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub country: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<String>,
}

impl Customer {
  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
      .trim()
      .to_string()
  }
}

impl Resource for Customer {
  const COLLECTION: &'static str = "customers";
  const EXCLUDED_FIELDS: &'static [&'static str] =
    &["full_name", "puppies", "purchase_count", "contracts"];

  fn id(&self) -> Option<i64> {
    self.id
  }
}

/// Outcome of replaying the pending-write log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
  /// Writes the server accepted
  pub replayed: usize,
  /// Writes the server refused; dropped from the log
  pub rejected: usize,
  /// Writes still waiting because the server is unreachable
  pub remaining: usize,
}

/// Clones share the pending-write log and the lock that serializes every
/// change to the shadow copy and the log.
#[derive(Clone)]
pub struct CustomerApi {
  client: ApiClient,
  store: Arc<dyn LocalStore>,
  queue: OfflineQueue,
  local: Arc<Mutex<()>>,
  offline: bool,
}

impl CustomerApi {
  pub fn new(client: ApiClient, store: Arc<dyn LocalStore>) -> Self {
    Self {
      client,
      queue: OfflineQueue::new(store.clone()),
      store,
      local: Arc::new(Mutex::new(())),
      offline: true,
    }
  }

  /// Held across each read-modify-write of local state. Taken before the
  /// queue's own lock, never after.
  fn local_guard(&self) -> Result<MutexGuard<'_, ()>> {
    self
      .local
      .lock()
      .map_err(|e| eyre!("Customer storage lock poisoned: {}", e))
  }

  /// Enable or disable the local fallback.
  pub fn with_offline(mut self, enabled: bool) -> Self {
    self.offline = enabled;
    self
  }

  pub fn queue(&self) -> &OfflineQueue {
    &self.queue
  }

  /// Records currently held in local storage.
  pub fn shadow(&self) -> Result<Vec<Customer>> {
    Ok(read_json(self.store.as_ref(), CUSTOMERS_KEY)?.unwrap_or_default())
  }

  fn save_shadow(&self, records: &[Customer]) -> Result<()> {
    write_json(self.store.as_ref(), CUSTOMERS_KEY, records)
  }

  pub async fn fetch_customers(&self) -> ApiResponse<Vec<Customer>> {
    let response: ApiResponse<Vec<Customer>> = resource::list(&self.client).await;

    if let Some(customers) = response.data() {
      if let Err(e) = self.mirror(customers) {
        warn!(error = %e, "Failed to mirror customers to local storage");
      }
      return response;
    }

    if self.offline && response.is_network_error() {
      match self.shadow() {
        Ok(records) => {
          return ApiResponse::success(200, records)
            .with_source(DataSource::LocalStorage)
            .with_message("Customers loaded in local storage mode");
        }
        Err(e) => warn!(error = %e, "Failed to read customers from local storage"),
      }
    }
    response
  }

  pub async fn fetch_customer(&self, id: i64) -> ApiResponse<Customer> {
    let response: ApiResponse<Customer> = resource::fetch(&self.client, id).await;

    if self.offline && response.is_network_error() {
      let local = self
        .shadow()
        .ok()
        .and_then(|records| records.into_iter().find(|c| c.id == Some(id)));
      if let Some(customer) = local {
        return ApiResponse::success(200, customer)
          .with_source(DataSource::LocalStorage)
          .with_message("Customer loaded in local storage mode");
      }
    }
    response
  }

  pub async fn create_customer(&self, customer: &Customer) -> ApiResponse<Customer> {
    let response = resource::create(&self.client, customer).await;

    if let Some(saved) = response.data() {
      self.upsert_shadow(saved);
      return response;
    }
    if !(self.offline && response.is_network_error()) {
      return response;
    }

    match self.create_local(customer) {
      Ok(saved) => ApiResponse::success(201, saved)
        .with_source(DataSource::LocalStorage)
        .with_message("Customer created in local storage mode"),
      Err(e) => {
        warn!(error = %e, "Local customer create failed");
        response
      }
    }
  }

  pub async fn update_customer(&self, customer: &Customer) -> ApiResponse<Customer> {
    let response = resource::update(&self.client, customer).await;

    if let Some(saved) = response.data() {
      self.upsert_shadow(saved);
      return response;
    }
    if !(self.offline && response.is_network_error()) {
      return response;
    }

    match self.update_local(customer) {
      Ok(Some(saved)) => ApiResponse::success(200, saved)
        .with_source(DataSource::LocalStorage)
        .with_message("Customer updated in local storage mode"),
      Ok(None) => response,
      Err(e) => {
        warn!(error = %e, "Local customer update failed");
        response
      }
    }
  }

  pub async fn delete_customer(&self, id: i64) -> ApiResponse<Value> {
    let response = resource::remove::<Customer>(&self.client, Some(id)).await;

    if response.ok() {
      self.remove_shadow(id);
      return response;
    }
    if !(self.offline && response.is_network_error()) {
      return response;
    }

    match self.delete_local(id) {
      Ok(()) => ApiResponse::success(200, json!({ "id": id }))
        .with_source(DataSource::LocalStorage)
        .with_message("Customer deleted in local storage mode"),
      Err(e) => {
        warn!(error = %e, "Local customer delete failed");
        response
      }
    }
  }

  /// Replay queued customer writes in order.
  ///
  /// Stops at the first transport failure; entries the server rejects are
  /// dropped and counted.
  pub async fn sync_pending(&self) -> Result<SyncReport> {
    let mut report = SyncReport::default();

    while let Some(entry) = self.next_pending()? {
      let response = self.replay(&entry).await;

      if response.is_network_error() {
        report.remaining = self.pending_count()?;
        debug!(remaining = report.remaining, "Server unreachable, sync paused");
        return Ok(report);
      }

      if response.ok() {
        report.replayed += 1;
      } else {
        warn!(
          seq = entry.seq,
          local_id = entry.local_id,
          error = ?response.error(),
          "Server rejected queued customer write"
        );
        report.rejected += 1;
      }
      self.settle(&entry, &response)?;
    }

    if report.replayed + report.rejected > 0 {
      info!(
        replayed = report.replayed,
        rejected = report.rejected,
        "Customer writes synchronized"
      );
    }
    Ok(report)
  }

  /// Run [`sync_pending`](Self::sync_pending) every `period` until stopped.
  pub fn spawn_sync_worker(&self, period: Duration) -> SyncWorker {
    let api = self.clone();
    let handle = tokio::spawn(async move {
      let mut ticker = interval(period);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      loop {
        ticker.tick().await;
        match api.pending_count() {
          Ok(0) => continue,
          Ok(_) => {}
          Err(e) => {
            warn!(error = %e, "Failed to read pending writes");
            continue;
          }
        }
        if let Err(e) = api.sync_pending().await {
          warn!(error = %e, "Customer sync failed");
        }
      }
    });
    SyncWorker { handle }
  }

  fn pending_count(&self) -> Result<usize> {
    Ok(
      self
        .queue
        .list()?
        .iter()
        .filter(|e| e.collection == Customer::COLLECTION)
        .count(),
    )
  }

  fn next_pending(&self) -> Result<Option<PendingWrite>> {
    Ok(
      self
        .queue
        .list()?
        .into_iter()
        .find(|e| e.collection == Customer::COLLECTION),
    )
  }

  async fn replay(&self, entry: &PendingWrite) -> ApiResponse {
    let exclude = Customer::EXCLUDED_FIELDS;
    match &entry.op {
      PendingOp::Create => {
        self
          .client
          .post_excluding(Customer::COLLECTION, &entry.payload, exclude)
          .await
      }
      PendingOp::Update { id } => {
        self
          .client
          .put_excluding(&item_endpoint::<Customer>(Some(*id)), &entry.payload, exclude)
          .await
      }
      PendingOp::Delete { id } => {
        self
          .client
          .delete(&item_endpoint::<Customer>(Some(*id)))
          .await
      }
    }
  }

  /// Drop a replayed entry from the log, then adopt the server id for an
  /// accepted create. The entry leaves the log first so a write the server
  /// took is never sent twice.
  fn settle(&self, entry: &PendingWrite, response: &ApiResponse) -> Result<()> {
    let _guard = self.local_guard()?;
    self.queue.remove(entry.seq)?;

    if response.ok() && entry.op == PendingOp::Create {
      if let Err(e) = self.adopt_server_id(entry, response.data()) {
        warn!(
          local_id = entry.local_id,
          error = %e,
          "Failed to adopt server id for replayed customer"
        );
      }
    }
    Ok(())
  }

  /// After a replayed create, swap the local id for the server's everywhere.
  fn adopt_server_id(&self, entry: &PendingWrite, data: Option<&Value>) -> Result<()> {
    let server_id = match data.and_then(|d| d.get("id")).and_then(Value::as_i64) {
      Some(id) => id,
      None => return Ok(()),
    };

    let server_copy = data.and_then(|d| serde_json::from_value::<Customer>(d.clone()).ok());
    let mut records = self.shadow()?;
    for record in records
      .iter_mut()
      .filter(|c| c.id == Some(entry.local_id))
    {
      match &server_copy {
        Some(copy) => *record = copy.clone(),
        None => record.id = Some(server_id),
      }
    }
    self.save_shadow(&records)?;
    self
      .queue
      .rewrite_id(Customer::COLLECTION, entry.local_id, server_id)
  }

  fn create_local(&self, customer: &Customer) -> Result<Customer> {
    let _guard = self.local_guard()?;
    let mut records = self.shadow()?;
    let now = Utc::now();

    let mut id = now.timestamp_millis();
    if let Some(max) = records.iter().filter_map(|c| c.id).max() {
      if id <= max {
        id = max + 1;
      }
    }

    let mut saved = customer.clone();
    saved.id = Some(id);
    saved.created_at = Some(now.to_rfc3339());
    saved.updated_at = saved.created_at.clone();
    records.push(saved.clone());
    self.save_shadow(&records)?;

    let payload = sanitize_api_data(&serde_json::to_value(customer)?, &["id"]);
    self
      .queue
      .push(Customer::COLLECTION, PendingOp::Create, id, payload)?;
    debug!(local_id = id, "Customer stored locally");
    Ok(saved)
  }

  fn update_local(&self, customer: &Customer) -> Result<Option<Customer>> {
    let id = match customer.id {
      Some(id) => id,
      None => return Ok(None),
    };
    let _guard = self.local_guard()?;
    let mut records = self.shadow()?;
    let now = Utc::now().to_rfc3339();

    let mut saved = customer.clone();
    saved.updated_at = Some(now);
    match records.iter_mut().find(|c| c.id == Some(id)) {
      Some(existing) => {
        saved.created_at = existing.created_at.clone();
        *existing = saved.clone();
      }
      None => records.push(saved.clone()),
    }
    self.save_shadow(&records)?;

    let payload = sanitize_api_data(&serde_json::to_value(customer)?, &["id"]);
    self
      .queue
      .push(Customer::COLLECTION, PendingOp::Update { id }, id, payload)?;
    Ok(Some(saved))
  }

  fn delete_local(&self, id: i64) -> Result<()> {
    let _guard = self.local_guard()?;
    let mut records = self.shadow()?;
    records.retain(|c| c.id != Some(id));
    self.save_shadow(&records)?;

    let queued: Vec<PendingWrite> = self
      .queue
      .list()?
      .into_iter()
      .filter(|e| e.collection == Customer::COLLECTION && e.local_id == id)
      .collect();

    // Never reached the server: forget it instead of replaying create + delete
    if queued.iter().any(|e| e.op == PendingOp::Create) {
      for entry in queued {
        self.queue.remove(entry.seq)?;
      }
      return Ok(());
    }

    self
      .queue
      .push(Customer::COLLECTION, PendingOp::Delete { id }, id, Value::Null)?;
    Ok(())
  }

  /// Replace the shadow copy with the server list, keeping records that only
  /// exist locally.
  fn mirror(&self, server: &[Customer]) -> Result<()> {
    let _guard = self.local_guard()?;
    let unsynced: HashSet<i64> = self
      .queue
      .list()?
      .into_iter()
      .filter(|e| e.collection == Customer::COLLECTION && e.op == PendingOp::Create)
      .map(|e| e.local_id)
      .collect();

    let mut records = server.to_vec();
    records.extend(
      self
        .shadow()?
        .into_iter()
        .filter(|c| c.id.is_some_and(|id| unsynced.contains(&id))),
    );
    self.save_shadow(&records)
  }

  fn upsert_shadow(&self, customer: &Customer) {
    let result = self.local_guard().and_then(|_guard| {
      let mut records = self.shadow()?;
      match records.iter_mut().find(|c| c.id.is_some() && c.id == customer.id) {
        Some(existing) => *existing = customer.clone(),
        None => records.push(customer.clone()),
      }
      self.save_shadow(&records)
    });
    if let Err(e) = result {
      warn!(error = %e, "Failed to update local customer copy");
    }
  }

  fn remove_shadow(&self, id: i64) {
    let result = self.local_guard().and_then(|_guard| {
      let mut records = self.shadow()?;
      records.retain(|c| c.id != Some(id));
      self.save_shadow(&records)
    });
    if let Err(e) = result {
      warn!(error = %e, "Failed to update local customer copy");
    }
  }
}

/// Background replay task; aborted on [`stop`](Self::stop) or drop.
pub struct SyncWorker {
  handle: JoinHandle<()>,
}

impl SyncWorker {
  pub fn stop(self) {
    self.handle.abort();
  }
}

impl Drop for SyncWorker {
  fn drop(&mut self) {
    self.handle.abort();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::testing::MockTransport;
  use crate::api::Method;
  use crate::storage::MemoryStore;
  use std::sync::atomic::{AtomicBool, Ordering};
  use tokio::time::sleep;

  /// Memory store whose shadow-copy writes can be made to fail.
  #[derive(Default)]
  struct FailingShadowStore {
    inner: MemoryStore,
    fail_shadow: AtomicBool,
  }

  impl LocalStore for FailingShadowStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
      self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
      if key == CUSTOMERS_KEY && self.fail_shadow.load(Ordering::SeqCst) {
        return Err(eyre!("disk full"));
      }
      self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
      self.inner.remove(key)
    }

    fn keys(&self) -> Result<Vec<String>> {
      self.inner.keys()
    }
  }

  const BASE: &str = "http://kennel.test/api";

  fn setup() -> (MockTransport, CustomerApi) {
    let mock = MockTransport::new();
    let client = ApiClient::builder(BASE)
      .transport(Arc::new(mock.clone()))
      .build()
      .unwrap();
    let api = CustomerApi::new(client, Arc::new(MemoryStore::new()));
    (mock, api)
  }

  fn jane() -> Customer {
    Customer {
      first_name: "Jane".to_string(),
      last_name: "Doe".to_string(),
      email: Some("jane@example.com".to_string()),
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn test_create_falls_back_to_local_storage() {
    let (mock, api) = setup();
    mock.fail(Method::Post, &format!("{}/customers", BASE), "connection refused");

    let response = api.create_customer(&jane()).await;

    assert!(response.ok());
    assert_eq!(response.source(), Some(DataSource::LocalStorage));
    assert!(response.message().unwrap().ends_with("local storage mode"));

    let saved = response.into_data().unwrap();
    assert!(saved.id.is_some());
    assert!(saved.created_at.is_some());
    assert_eq!(saved.created_at, saved.updated_at);

    assert_eq!(api.shadow().unwrap(), vec![saved]);
    assert_eq!(api.queue().len().unwrap(), 1);
  }

  #[tokio::test]
  async fn test_http_errors_do_not_fall_back() {
    let (mock, api) = setup();
    mock.json(
      Method::Post,
      &format!("{}/customers", BASE),
      400,
      json!({ "error": "email already exists" }),
    );

    let response = api.create_customer(&jane()).await;
    assert!(!response.ok());
    assert_eq!(response.status(), Some(400));
    assert!(api.shadow().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_offline_disabled_returns_failure() {
    let (_mock, api) = setup();
    let api = api.with_offline(false);

    let response = api.create_customer(&jane()).await;
    assert!(response.is_network_error());
    assert!(api.queue().is_empty().unwrap());
  }

  #[tokio::test]
  async fn test_fetch_serves_shadow_when_offline() {
    let (mock, api) = setup();
    let url = format!("{}/customers", BASE);
    mock.json(Method::Get, &url, 200, json!([{ "id": 1, "first_name": "Ann" }]));

    let online = api.fetch_customers().await;
    assert_eq!(online.source(), Some(DataSource::Network));

    let (offline_mock, offline_api) = setup();
    offline_mock.fail(Method::Get, &url, "timed out");
    write_json(offline_api.store.as_ref(), CUSTOMERS_KEY, &api.shadow().unwrap()).unwrap();

    let response = offline_api.fetch_customers().await;
    assert_eq!(response.source(), Some(DataSource::LocalStorage));
    assert_eq!(response.data().unwrap()[0].first_name, "Ann");
  }

  #[tokio::test]
  async fn test_sync_replays_create_and_adopts_server_id() {
    let (mock, api) = setup();
    let url = format!("{}/customers", BASE);
    mock.fail(Method::Post, &url, "connection refused");
    let local = api.create_customer(&jane()).await.into_data().unwrap();
    let local_id = local.id.unwrap();

    // Edit while still offline
    let mut edited = local.clone();
    edited.phone = Some("555-0100".to_string());
    mock.fail(Method::Put, &format!("{}/customers/{}", BASE, local_id), "connection refused");
    assert!(api.update_customer(&edited).await.ok());
    assert_eq!(api.queue().len().unwrap(), 2);

    // Server back
    mock.clear(Method::Post, &url);
    mock.json(
      Method::Post,
      &url,
      201,
      json!({ "id": 501, "first_name": "Jane", "last_name": "Doe" }),
    );
    mock.json(Method::Put, &format!("{}/customers/501", BASE), 200, json!({ "id": 501 }));
    let report = api.sync_pending().await.unwrap();

    assert_eq!(
      report,
      SyncReport {
        replayed: 2,
        rejected: 0,
        remaining: 0
      }
    );
    assert!(api.queue().is_empty().unwrap());
    assert_eq!(api.shadow().unwrap()[0].id, Some(501));

    let create_body = mock
      .requests()
      .into_iter()
      .filter(|r| r.method == Method::Post)
      .last()
      .unwrap();
    let body = create_body.json_body().unwrap();
    assert!(body.get("id").is_none());
    assert!(body.get("created_at").is_none());
  }

  #[tokio::test]
  async fn test_sync_stops_while_offline() {
    let (mock, api) = setup();
    mock.fail(Method::Post, &format!("{}/customers", BASE), "connection refused");
    api.create_customer(&jane()).await;

    let report = api.sync_pending().await.unwrap();
    assert_eq!(report.replayed, 0);
    assert_eq!(report.remaining, 1);
  }

  #[tokio::test]
  async fn test_deleting_unsynced_record_cancels_create() {
    let (mock, api) = setup();
    mock.fail(Method::Post, &format!("{}/customers", BASE), "connection refused");
    let local = api.create_customer(&jane()).await.into_data().unwrap();
    let id = local.id.unwrap();
    mock.fail(Method::Delete, &format!("{}/customers/{}", BASE, id), "connection refused");

    let response = api.delete_customer(id).await;
    assert!(response.ok());
    assert!(api.shadow().unwrap().is_empty());
    assert!(api.queue().is_empty().unwrap());
  }

  #[tokio::test]
  async fn test_rejected_write_is_dropped() {
    let (mock, api) = setup();
    let item = format!("{}/customers/9", BASE);
    mock.fail(Method::Delete, &item, "connection refused");
    api.delete_customer(9).await;
    assert_eq!(api.queue().len().unwrap(), 1);

    mock.clear(Method::Delete, &item);
    mock.json(Method::Delete, &item, 404, json!({ "error": "Customer not found" }));
    let report = api.sync_pending().await.unwrap();
    assert_eq!(report.rejected, 1);
    assert!(api.queue().is_empty().unwrap());
  }

  #[tokio::test]
  async fn test_accepted_create_is_not_replayed_when_local_update_fails() {
    let mock = MockTransport::new();
    let client = ApiClient::builder(BASE)
      .transport(Arc::new(mock.clone()))
      .build()
      .unwrap();
    let store = Arc::new(FailingShadowStore::default());
    let api = CustomerApi::new(client, store.clone());
    let url = format!("{}/customers", BASE);

    mock.fail(Method::Post, &url, "connection refused");
    assert!(api.create_customer(&jane()).await.ok());

    store.fail_shadow.store(true, Ordering::SeqCst);
    mock.clear(Method::Post, &url);
    mock.json(Method::Post, &url, 201, json!({ "id": 501, "first_name": "Jane" }));

    let report = api.sync_pending().await.unwrap();
    assert_eq!(report.replayed, 1);
    assert!(api.queue().is_empty().unwrap());

    let again = api.sync_pending().await.unwrap();
    assert_eq!(again, SyncReport::default());
    assert_eq!(mock.count_for(Method::Post, &url), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_sync_worker_replays_on_interval_until_stopped() {
    let (mock, api) = setup();
    let url = format!("{}/customers", BASE);
    let worker = api.spawn_sync_worker(Duration::from_secs(60));

    // Nothing queued: ticks pass without requests
    sleep(Duration::from_secs(150)).await;
    assert_eq!(mock.request_count(), 0);

    mock.fail(Method::Post, &url, "connection refused");
    let local = api.create_customer(&jane()).await.into_data().unwrap();
    assert_eq!(api.queue().len().unwrap(), 1);

    mock.clear(Method::Post, &url);
    mock.json(Method::Post, &url, 201, json!({ "id": 501, "first_name": "Jane" }));
    sleep(Duration::from_secs(60)).await;

    assert!(api.queue().is_empty().unwrap());
    assert_eq!(mock.count_for(Method::Post, &url), 2);
    let shadow = api.shadow().unwrap();
    assert_eq!(shadow.len(), 1);
    assert_eq!(shadow[0].id, Some(501));
    assert_ne!(local.id, Some(501));

    worker.stop();
    mock.clear(Method::Post, &url);
    mock.fail(Method::Post, &url, "connection refused");
    api.create_customer(&jane()).await;
    let requests = mock.request_count();

    mock.clear(Method::Post, &url);
    mock.json(Method::Post, &url, 201, json!({ "id": 502 }));
    sleep(Duration::from_secs(300)).await;
    assert_eq!(mock.request_count(), requests);
    assert_eq!(api.queue().len().unwrap(), 1);
  }
}
