use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::heats::Heat;
use super::resource::{self, Resource};
use crate::api::{ApiClient, ApiResponse};

/// Dog record. Joined fields (`sire_name`, `dam_name`) and timestamps are
/// read-only and stripped from writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dog {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<i64>,
  #[serde(default)]
  pub call_name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub registered_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub breed: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gender: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub color: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub birth_date: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub microchip: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub is_breeding: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sire_id: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dam_id: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub photo_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sire_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dam_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<String>,
}

impl Resource for Dog {
  const COLLECTION: &'static str = "dogs";
  // Derived on the server from birth_date and the litters table
  const EXCLUDED_FIELDS: &'static [&'static str] = &["age", "offspring_count"];

  fn id(&self) -> Option<i64> {
    self.id
  }
}

pub async fn fetch_dogs(client: &ApiClient) -> ApiResponse<Vec<Dog>> {
  resource::list(client).await
}

/// Dogs filtered by gender (`male` / `female`).
pub async fn fetch_dogs_by_gender(client: &ApiClient, gender: &str) -> ApiResponse<Vec<Dog>> {
  resource::list_where(client, &format!("gender={}", gender)).await
}

pub async fn fetch_dog(client: &ApiClient, id: i64) -> ApiResponse<Dog> {
  resource::fetch(client, id).await
}

pub async fn create_dog(client: &ApiClient, dog: &Dog) -> ApiResponse<Dog> {
  resource::create(client, dog).await
}

pub async fn update_dog(client: &ApiClient, dog: &Dog) -> ApiResponse<Dog> {
  resource::update(client, dog).await
}

pub async fn delete_dog(client: &ApiClient, id: i64) -> ApiResponse<Value> {
  resource::remove::<Dog>(client, Some(id)).await
}

/// Heat cycles recorded for one dog.
pub async fn dog_heats(client: &ApiClient, dog_id: i64) -> ApiResponse<Vec<Heat>> {
  client.get_as(&format!("dogs/{}/heats", dog_id)).await
}
