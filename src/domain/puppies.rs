use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::resource::{self, Resource};
use crate::api::{ApiClient, ApiResponse};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Puppy {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub litter_id: Option<i64>,
  #[serde(default)]
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gender: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub color: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub markings: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub birth_weight: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub microchip: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub price: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub customer_id: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub litter_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub customer_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<String>,
}

impl Resource for Puppy {
  const COLLECTION: &'static str = "puppies";
  // Joined from litters for display; a real column only on the litter itself
  const EXCLUDED_FIELDS: &'static [&'static str] = &["litter_name", "weight_history"];

  fn id(&self) -> Option<i64> {
    self.id
  }
}

pub async fn fetch_puppies(client: &ApiClient) -> ApiResponse<Vec<Puppy>> {
  resource::list(client).await
}

pub async fn fetch_puppy(client: &ApiClient, id: i64) -> ApiResponse<Puppy> {
  resource::fetch(client, id).await
}

pub async fn create_puppy(client: &ApiClient, puppy: &Puppy) -> ApiResponse<Puppy> {
  resource::create(client, puppy).await
}

pub async fn update_puppy(client: &ApiClient, puppy: &Puppy) -> ApiResponse<Puppy> {
  resource::update(client, puppy).await
}

pub async fn delete_puppy(client: &ApiClient, id: i64) -> ApiResponse<Value> {
  resource::remove::<Puppy>(client, Some(id)).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::testing::MockTransport;
  use crate::api::Method;
  use serde_json::json;
  use std::sync::Arc;

  #[tokio::test]
  async fn test_create_puppy_drops_litter_name() {
    let base = "http://kennel.test/api";
    let mock = MockTransport::new();
    mock.json(
      Method::Post,
      &format!("{}/puppies", base),
      201,
      json!({ "id": 12, "name": "Pip", "litter_id": 3 }),
    );
    let client = ApiClient::builder(base)
      .transport(Arc::new(mock.clone()))
      .build()
      .unwrap();

    let puppy = Puppy {
      litter_id: Some(3),
      name: "Pip".to_string(),
      litter_name: Some("Spring".to_string()),
      customer_name: Some("Ann".to_string()),
      ..Default::default()
    };
    let saved = create_puppy(&client, &puppy).await;
    assert_eq!(saved.data().unwrap().id, Some(12));

    let body = mock.last_request().unwrap().json_body().cloned().unwrap();
    assert_eq!(body, json!({ "litter_id": 3, "name": "Pip" }));
  }
}
