//! Optional endpoints that not every deployment serves.
//!
//! These go through [`ApiClient::get_soft`], so with the fallback layer
//! installed a missing endpoint answers with its placeholder instead of an
//! error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiClient, ApiResponse};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
  pub id: i64,
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default)]
  pub message: Option<String>,
  #[serde(default, rename = "type")]
  pub kind: Option<String>,
  #[serde(default)]
  pub is_read: bool,
  #[serde(default)]
  pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
  #[serde(default)]
  pub status: String,
  #[serde(default)]
  pub checks: Vec<Value>,
  #[serde(default)]
  pub message: Option<String>,
}

pub async fn notifications(client: &ApiClient) -> ApiResponse<Vec<Notification>> {
  client.get_soft("notifications").await.decode()
}

pub async fn dashboard_health(client: &ApiClient) -> ApiResponse<HealthSummary> {
  client.get_soft("dashboard/health").await.decode()
}

pub async fn pages(client: &ApiClient) -> ApiResponse<Vec<Value>> {
  client.get_soft("pages").await.decode()
}
