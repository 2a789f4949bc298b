use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::customers::Customer;
use super::resource::{self, Resource};
use crate::api::{ApiClient, ApiResponse};

/// Pipeline stage of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
  New,
  Contacted,
  Qualified,
  Waitlisted,
  Converted,
  Lost,
}

impl LeadStatus {
  pub const ALL: [LeadStatus; 6] = [
    LeadStatus::New,
    LeadStatus::Contacted,
    LeadStatus::Qualified,
    LeadStatus::Waitlisted,
    LeadStatus::Converted,
    LeadStatus::Lost,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      LeadStatus::New => "new",
      LeadStatus::Contacted => "contacted",
      LeadStatus::Qualified => "qualified",
      LeadStatus::Waitlisted => "waitlisted",
      LeadStatus::Converted => "converted",
      LeadStatus::Lost => "lost",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Self::ALL
      .into_iter()
      .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
  }
}

impl fmt::Display for LeadStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lead {
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
  pub source: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<LeadStatus>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub interested_in: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub customer_id: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<String>,
}

impl Resource for Lead {
  const COLLECTION: &'static str = "leads";
  const EXCLUDED_FIELDS: &'static [&'static str] = &["full_name", "days_open"];

  fn id(&self) -> Option<i64> {
    self.id
  }
}

pub async fn fetch_leads(client: &ApiClient) -> ApiResponse<Vec<Lead>> {
  resource::list(client).await
}

pub async fn fetch_leads_by_status(
  client: &ApiClient,
  status: LeadStatus,
) -> ApiResponse<Vec<Lead>> {
  resource::list_where(client, &format!("status={}", status)).await
}

pub async fn fetch_lead(client: &ApiClient, id: i64) -> ApiResponse<Lead> {
  resource::fetch(client, id).await
}

pub async fn create_lead(client: &ApiClient, lead: &Lead) -> ApiResponse<Lead> {
  resource::create(client, lead).await
}

pub async fn update_lead(client: &ApiClient, lead: &Lead) -> ApiResponse<Lead> {
  resource::update(client, lead).await
}

pub async fn delete_lead(client: &ApiClient, id: i64) -> ApiResponse<Value> {
  resource::remove::<Lead>(client, Some(id)).await
}

/// Move a lead to another pipeline stage.
pub async fn update_lead_status(
  client: &ApiClient,
  id: i64,
  status: LeadStatus,
) -> ApiResponse<Value> {
  client
    .put(
      &format!("leads/{}/status", id),
      &json!({ "status": status }),
    )
    .await
}

/// Turn a lead into a customer record; the server links the two.
pub async fn convert_lead_to_customer(client: &ApiClient, id: i64) -> ApiResponse<Customer> {
  client
    .post(&format!("leads/{}/convert", id), &json!({}))
    .await
    .decode()
}
