use serde_json::Value;

use super::collection::CollectionStore;
use crate::api::ApiResponse;
use crate::domain::leads::{self, Lead, LeadStatus};

/// Cached sales leads.
pub type LeadStore = CollectionStore<Lead>;

impl CollectionStore<Lead> {
  pub fn with_status(&self, status: LeadStatus) -> Vec<&Lead> {
    self
      .items()
      .iter()
      .filter(|lead| lead.status == Some(status))
      .collect()
  }

  /// Move a lead to another stage, updating the cached copy on success.
  pub async fn set_status(&mut self, id: i64, status: LeadStatus) -> ApiResponse<Value> {
    let response = leads::update_lead_status(self.client(), id, status).await;

    if response.ok() {
      if let Some(lead) = self.items_mut().iter_mut().find(|l| l.id == Some(id)) {
        lead.status = Some(status);
      }
      self.set_error(None);
    } else {
      self.set_error(response.error().map(|e| e.to_string()));
    }
    response
  }
}
