use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::puppies::Puppy;
use super::resource::{self, Resource};
use crate::api::{ApiClient, ApiResponse};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Litter {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub litter_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sire_id: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dam_id: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub breeding_date: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub expected_date: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub whelp_date: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub num_puppies: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub price: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub deposit: Option<f64>,
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

impl Resource for Litter {
  const COLLECTION: &'static str = "litters";
  const EXCLUDED_FIELDS: &'static [&'static str] = &["puppies", "puppy_count"];

  fn id(&self) -> Option<i64> {
    self.id
  }
}

pub async fn fetch_litters(client: &ApiClient) -> ApiResponse<Vec<Litter>> {
  resource::list(client).await
}

pub async fn fetch_litter(client: &ApiClient, id: i64) -> ApiResponse<Litter> {
  resource::fetch(client, id).await
}

pub async fn create_litter(client: &ApiClient, litter: &Litter) -> ApiResponse<Litter> {
  resource::create(client, litter).await
}

pub async fn update_litter(client: &ApiClient, litter: &Litter) -> ApiResponse<Litter> {
  resource::update(client, litter).await
}

pub async fn delete_litter(client: &ApiClient, id: i64) -> ApiResponse<Value> {
  resource::remove::<Litter>(client, Some(id)).await
}

pub async fn litter_puppies(client: &ApiClient, litter_id: i64) -> ApiResponse<Vec<Puppy>> {
  client
    .get_as(&format!("litters/{}/puppies", litter_id))
    .await
}
