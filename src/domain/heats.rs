use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::resource::{self, Resource};
use crate::api::{ApiClient, ApiResponse};

/// Heat cycle of a dam.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Heat {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dog_id: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub start_date: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub end_date: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mating_date: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sire_id: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dog_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sire_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<String>,
}

impl Resource for Heat {
  const COLLECTION: &'static str = "heats";

  fn id(&self) -> Option<i64> {
    self.id
  }
}

pub async fn fetch_heats(client: &ApiClient) -> ApiResponse<Vec<Heat>> {
  resource::list(client).await
}

pub async fn fetch_heat(client: &ApiClient, id: i64) -> ApiResponse<Heat> {
  resource::fetch(client, id).await
}

pub async fn create_heat(client: &ApiClient, heat: &Heat) -> ApiResponse<Heat> {
  resource::create(client, heat).await
}

pub async fn update_heat(client: &ApiClient, heat: &Heat) -> ApiResponse<Heat> {
  resource::update(client, heat).await
}

pub async fn delete_heat(client: &ApiClient, id: i64) -> ApiResponse<Value> {
  resource::remove::<Heat>(client, Some(id)).await
}
