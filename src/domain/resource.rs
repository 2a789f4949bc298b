//! CRUD shared by the plain REST collections (dogs, litters, puppies, heats, leads).

use std::fmt::Display;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::api::{ApiClient, ApiError, ApiResponse};

/// A record type living under one REST collection.
pub trait Resource: Clone + Serialize + DeserializeOwned + Send + Sync {
  /// Collection path, e.g. `dogs`
  const COLLECTION: &'static str;

  /// Keys dropped from writes in addition to the shared non-schema list.
  const EXCLUDED_FIELDS: &'static [&'static str] = &[];

  fn id(&self) -> Option<i64>;
}

/// `<collection>/<id>`, with `undefined` standing in for a missing id so the
/// client's unset-id guard rejects the call.
pub fn item_endpoint<R: Resource>(id: Option<i64>) -> String {
  match id {
    Some(id) => format!("{}/{}", R::COLLECTION, id),
    None => format!("{}/undefined", R::COLLECTION),
  }
}

pub async fn list<R: Resource>(client: &ApiClient) -> ApiResponse<Vec<R>> {
  client.get_as(R::COLLECTION).await
}

/// List with a raw query string, e.g. `gender=female`.
pub async fn list_where<R: Resource>(client: &ApiClient, query: &str) -> ApiResponse<Vec<R>> {
  if query.is_empty() {
    return list(client).await;
  }
  client
    .get_as(&format!("{}?{}", R::COLLECTION, query))
    .await
}

pub async fn fetch<R: Resource>(client: &ApiClient, id: impl Display) -> ApiResponse<R> {
  client
    .get_as(&format!("{}/{}", R::COLLECTION, id))
    .await
}

pub async fn create<R: Resource>(client: &ApiClient, record: &R) -> ApiResponse<R> {
  let sent = match serde_json::to_value(record) {
    Ok(value) => value,
    Err(e) => return ApiResponse::failure(None, ApiError::Decode(e.to_string())),
  };
  client
    .post_excluding(R::COLLECTION, &sent, R::EXCLUDED_FIELDS)
    .await
    .map(|data| merge_saved(record, data))
}

/// PUT the record to its own id.
pub async fn update<R: Resource>(client: &ApiClient, record: &R) -> ApiResponse<R> {
  let sent = match serde_json::to_value(record) {
    Ok(value) => value,
    Err(e) => return ApiResponse::failure(None, ApiError::Decode(e.to_string())),
  };
  client
    .put_excluding(&item_endpoint::<R>(record.id()), &sent, R::EXCLUDED_FIELDS)
    .await
    .map(|data| merge_saved(record, data))
}

pub async fn remove<R: Resource>(client: &ApiClient, id: Option<i64>) -> ApiResponse<Value> {
  client.delete(&item_endpoint::<R>(id)).await
}

/// The saved record: the server's copy when it echoed one back (it carries an
/// `id`), otherwise what was sent.
fn merge_saved<R: Resource>(sent: &R, data: Value) -> R {
  let echoed = data
    .as_object()
    .is_some_and(|object| object.contains_key("id"));
  if echoed {
    if let Ok(saved) = serde_json::from_value::<R>(data) {
      return saved;
    }
  }
  sent.clone()
}
