//! Fallback layer for endpoints that may not exist on every deployment.
//!
//! [`FallbackTransport`] decorates another transport. GET requests under the
//! API base whose endpoint is known to be missing get a static payload
//! instead of a round trip; a fresh 404 or transport failure on an endpoint
//! with a registered payload is replaced by that payload.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::missing::MissingEndpoints;
use super::transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use super::url::{endpoint_from_url, endpoint_path, normalize_endpoint};

/// Static payloads served in place of absent endpoints.
///
/// Endpoints are relative to the client's base URL.
#[derive(Debug, Clone, Default)]
pub struct FallbackTable {
  entries: HashMap<String, Value>,
}

impl FallbackTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Notifications feed, health dashboard summary and pages listing.
  pub fn defaults() -> Self {
    let mut table = Self::new();
    table.register("notifications", json!([]));
    table.register(
      "dashboard/health",
      json!({
        "status": "unknown",
        "checks": [],
        "message": "Health summary unavailable on this deployment",
      }),
    );
    table.register("pages", json!([]));
    table
  }

  pub fn register(&mut self, endpoint: &str, payload: Value) {
    self.entries.insert(normalize_endpoint(endpoint), payload);
  }

  /// Exact endpoint first, then the endpoint without its query string.
  pub fn get(&self, endpoint: &str) -> Option<&Value> {
    let cleaned = normalize_endpoint(endpoint);
    self
      .entries
      .get(&cleaned)
      .or_else(|| self.entries.get(endpoint_path(&cleaned)))
  }

  pub fn contains(&self, endpoint: &str) -> bool {
    self.get(endpoint).is_some()
  }

  pub fn endpoints(&self) -> Vec<String> {
    let mut keys: Vec<String> = self.entries.keys().cloned().collect();
    keys.sort();
    keys
  }
}

pub struct FallbackTransport {
  inner: Arc<dyn Transport>,
  base_url: String,
  missing: MissingEndpoints,
  fallbacks: Arc<FallbackTable>,
}

impl FallbackTransport {
  pub fn new(
    inner: Arc<dyn Transport>,
    base_url: impl Into<String>,
    missing: MissingEndpoints,
    fallbacks: FallbackTable,
  ) -> Self {
    Self {
      inner,
      base_url: base_url.into(),
      missing,
      fallbacks: Arc::new(fallbacks),
    }
  }

  pub fn fallbacks(&self) -> &FallbackTable {
    &self.fallbacks
  }

  fn substitute(payload: &Value) -> HttpResponse {
    let mut response = HttpResponse::json(200, payload);
    response.status_text = "OK".to_string();
    response.synthetic = true;
    response
  }
}

#[async_trait]
impl Transport for FallbackTransport {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
    if request.method != Method::Get {
      return self.inner.send(request).await;
    }
    let endpoint = match endpoint_from_url(&self.base_url, &request.url) {
      Some(endpoint) => endpoint,
      None => return self.inner.send(request).await,
    };
    let fallback = self.fallbacks.get(&endpoint);

    if let Some(payload) = fallback {
      if self.missing.has(&endpoint) {
        debug!(endpoint = %endpoint, "Serving fallback for known-missing endpoint");
        return Ok(Self::substitute(payload));
      }
    }

    match self.inner.send(request).await {
      Ok(response) if response.status == 404 => {
        self.missing.add(&endpoint);
        match fallback {
          Some(payload) => {
            debug!(endpoint = %endpoint, "Endpoint returned 404, serving fallback");
            Ok(Self::substitute(payload))
          }
          None => Ok(response),
        }
      }
      Ok(response) => Ok(response),
      Err(e) => match fallback {
        Some(payload) => {
          warn!(endpoint = %endpoint, error = %e, "Request failed, serving fallback");
          self.missing.add(&endpoint);
          Ok(Self::substitute(payload))
        }
        None => Err(e),
      },
    }
  }
}
