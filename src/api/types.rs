//! Uniform result envelope shared by the verb wrappers and domain modules.

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Failure kinds an API call can resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
  /// Endpoint was built from an unset id (`dogs/undefined`, `litters/null`)
  #[error("Invalid endpoint: {0}")]
  InvalidEndpoint(String),
  /// Connection, DNS or protocol failure before a response arrived
  #[error("{0}")]
  Network(String),
  /// Non-2xx answer from the server
  #[error("{message}")]
  Http { status: u16, message: String },
  /// Successful status with a body that is not JSON
  #[error("Invalid JSON response")]
  InvalidJson,
  /// Endpoint was already known to be absent, no request was made
  #[error("HTTP error! status: 404")]
  KnownMissing(String),
  /// Response JSON did not match the expected schema
  #[error("Unexpected response shape: {0}")]
  Decode(String),
}

impl ApiError {
  /// Default message for an HTTP error without a usable body.
  pub fn http_status(status: u16) -> Self {
    ApiError::Http {
      status,
      message: format!("HTTP error! status: {}", status),
    }
  }

  pub fn is_network(&self) -> bool {
    matches!(self, ApiError::Network(_))
  }
}

/// Where the data of a successful response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
  /// Real server response
  #[default]
  Network,
  /// Static payload substituted for a missing endpoint
  Fallback,
  /// Local shadow store, server unreachable
  LocalStorage,
}

/// Result of every API call. Callers branch on the variant (or `ok()`),
/// never on an error return.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T = Value> {
  Success {
    status: u16,
    data: T,
    source: DataSource,
    message: Option<String>,
  },
  Failure {
    status: Option<u16>,
    error: ApiError,
    /// Parsed error body, when the server sent one
    data: Option<Value>,
  },
}

impl<T> ApiResponse<T> {
  pub fn success(status: u16, data: T) -> Self {
    ApiResponse::Success {
      status,
      data,
      source: DataSource::Network,
      message: None,
    }
  }

  pub fn failure(status: Option<u16>, error: ApiError) -> Self {
    ApiResponse::Failure {
      status,
      error,
      data: None,
    }
  }

  pub fn with_source(mut self, new_source: DataSource) -> Self {
    if let ApiResponse::Success { source, .. } = &mut self {
      *source = new_source;
    }
    self
  }

  pub fn with_message(mut self, text: impl Into<String>) -> Self {
    if let ApiResponse::Success { message, .. } = &mut self {
      *message = Some(text.into());
    }
    self
  }

  pub fn ok(&self) -> bool {
    matches!(self, ApiResponse::Success { .. })
  }

  pub fn status(&self) -> Option<u16> {
    match self {
      ApiResponse::Success { status, .. } => Some(*status),
      ApiResponse::Failure { status, .. } => *status,
    }
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      ApiResponse::Success { data, .. } => Some(data),
      ApiResponse::Failure { .. } => None,
    }
  }

  pub fn into_data(self) -> Option<T> {
    match self {
      ApiResponse::Success { data, .. } => Some(data),
      ApiResponse::Failure { .. } => None,
    }
  }

  pub fn into_result(self) -> Result<T, ApiError> {
    match self {
      ApiResponse::Success { data, .. } => Ok(data),
      ApiResponse::Failure { error, .. } => Err(error),
    }
  }

  pub fn error(&self) -> Option<&ApiError> {
    match self {
      ApiResponse::Success { .. } => None,
      ApiResponse::Failure { error, .. } => Some(error),
    }
  }

  pub fn source(&self) -> Option<DataSource> {
    match self {
      ApiResponse::Success { source, .. } => Some(*source),
      ApiResponse::Failure { .. } => None,
    }
  }

  pub fn message(&self) -> Option<&str> {
    match self {
      ApiResponse::Success { message, .. } => message.as_deref(),
      ApiResponse::Failure { .. } => None,
    }
  }

  /// True when the call never produced a response (transport failure).
  pub fn is_network_error(&self) -> bool {
    self.error().is_some_and(ApiError::is_network)
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
    match self {
      ApiResponse::Success {
        status,
        data,
        source,
        message,
      } => ApiResponse::Success {
        status,
        data: f(data),
        source,
        message,
      },
      ApiResponse::Failure {
        status,
        error,
        data,
      } => ApiResponse::Failure {
        status,
        error,
        data,
      },
    }
  }
}

impl ApiResponse<Value> {
  /// Deserialize the success payload into a schema type.
  ///
  /// A payload that does not match becomes a `Decode` failure carrying the
  /// original status and body.
  pub fn decode<U: DeserializeOwned>(self) -> ApiResponse<U> {
    match self {
      ApiResponse::Success {
        status,
        data,
        source,
        message,
      } => match serde_json::from_value::<U>(data.clone()) {
        Ok(decoded) => ApiResponse::Success {
          status,
          data: decoded,
          source,
          message,
        },
        Err(e) => ApiResponse::Failure {
          status: Some(status),
          error: ApiError::Decode(e.to_string()),
          data: Some(data),
        },
      },
      ApiResponse::Failure {
        status,
        error,
        data,
      } => ApiResponse::Failure {
        status,
        error,
        data,
      },
    }
  }
}

/// Wire-shaped view of the envelope: `{ ok, status, data, error }`.
#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
  ok: bool,
  status: Option<u16>,
  data: Option<EnvelopeData<'a, T>>,
  error: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  source: Option<DataSource>,
  #[serde(skip_serializing_if = "Option::is_none")]
  message: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum EnvelopeData<'a, T: Serialize> {
  Data(&'a T),
  Body(&'a Value),
}

impl<T: Serialize> Serialize for ApiResponse<T> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let envelope = match self {
      ApiResponse::Success {
        status,
        data,
        source,
        message,
      } => Envelope {
        ok: true,
        status: Some(*status),
        data: Some(EnvelopeData::Data(data)),
        error: None,
        source: Some(*source),
        message: message.as_deref(),
      },
      ApiResponse::Failure {
        status,
        error,
        data,
      } => Envelope {
        ok: false,
        status: *status,
        data: data.as_ref().map(EnvelopeData::Body),
        error: Some(error.to_string()),
        source: None,
        message: None,
      },
    };
    envelope.serialize(serializer)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::Deserialize;
  use serde_json::json;

  #[derive(Debug, Deserialize, PartialEq)]
  struct Litter {
    id: u64,
    litter_name: String,
  }

  #[test]
  fn test_http_status_message() {
    assert_eq!(ApiError::http_status(404).to_string(), "HTTP error! status: 404");
  }

  #[test]
  fn test_decode_success() {
    let response = ApiResponse::success(200, json!({ "id": 3, "litter_name": "Test Litter" }));
    let decoded: ApiResponse<Litter> = response.decode();

    assert!(decoded.ok());
    assert_eq!(
      decoded.data(),
      Some(&Litter {
        id: 3,
        litter_name: "Test Litter".to_string()
      })
    );
  }

  #[test]
  fn test_decode_mismatch_keeps_body() {
    let response = ApiResponse::success(200, json!({ "id": "three" }));
    let decoded: ApiResponse<Litter> = response.decode();

    assert!(!decoded.ok());
    assert_eq!(decoded.status(), Some(200));
    assert!(matches!(decoded.error(), Some(ApiError::Decode(_))));
  }

  #[test]
  fn test_envelope_serialization() {
    let ok = ApiResponse::success(200, json!({ "id": 1 }));
    assert_eq!(
      serde_json::to_value(&ok).unwrap(),
      json!({ "ok": true, "status": 200, "data": { "id": 1 }, "error": null, "source": "network" })
    );

    let failed: ApiResponse = ApiResponse::failure(Some(404), ApiError::http_status(404));
    assert_eq!(
      serde_json::to_value(&failed).unwrap(),
      json!({ "ok": false, "status": 404, "data": null, "error": "HTTP error! status: 404" })
    );
  }
}
