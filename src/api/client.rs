//! HTTP verb wrappers.
//!
//! Every call resolves to an [`ApiResponse`]; transport failures, HTTP error
//! statuses and unparsable bodies all come back as `Failure` values.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::interceptor::{FallbackTable, FallbackTransport};
use super::missing::MissingEndpoints;
use super::notify::{LogNotifier, Notifier, Severity};
use super::sanitize::sanitize_api_data;
use super::transport::{
  HttpRequest, HttpResponse, Method, MultipartForm, RequestBody, ReqwestTransport, Transport,
};
use super::types::{ApiError, ApiResponse, DataSource};
use super::url::{clean_endpoint, format_api_url};
use crate::session::Session;

/// REST client for the kennel API.
///
/// Cheap to clone; clones share the session, the missing-endpoint set and
/// the transport.
#[derive(Clone)]
pub struct ApiClient {
  base_url: String,
  transport: Arc<dyn Transport>,
  missing: MissingEndpoints,
  session: Session,
  notifier: Arc<dyn Notifier>,
}

pub struct ApiClientBuilder {
  base_url: String,
  transport: Option<Arc<dyn Transport>>,
  timeout: Option<Duration>,
  session: Session,
  notifier: Arc<dyn Notifier>,
  known_missing: Vec<String>,
  fallbacks: Option<FallbackTable>,
}

impl ApiClientBuilder {
  /// Use a specific transport instead of reqwest.
  pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
    self.transport = Some(transport);
    self
  }

  pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn session(mut self, session: Session) -> Self {
    self.session = session;
    self
  }

  pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
    self.notifier = notifier;
    self
  }

  /// Endpoints to treat as missing from the start.
  pub fn known_missing<I, S>(mut self, endpoints: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self
      .known_missing
      .extend(endpoints.into_iter().map(Into::into));
    self
  }

  /// Install the fallback layer with the given payload table.
  pub fn fallbacks(mut self, table: FallbackTable) -> Self {
    self.fallbacks = Some(table);
    self
  }

  pub fn build(self) -> Result<ApiClient> {
    let missing = MissingEndpoints::with_warm_up(
      self
        .known_missing
        .iter()
        .map(|endpoint| clean_endpoint(&self.base_url, endpoint))
        .filter(|key| !key.is_empty()),
    );

    let transport: Arc<dyn Transport> = match self.transport {
      Some(transport) => transport,
      None => Arc::new(ReqwestTransport::new(self.timeout)?),
    };
    let transport: Arc<dyn Transport> = match self.fallbacks {
      Some(table) => Arc::new(FallbackTransport::new(
        transport,
        self.base_url.clone(),
        missing.clone(),
        table,
      )),
      None => transport,
    };

    Ok(ApiClient {
      base_url: self.base_url,
      transport,
      missing,
      session: self.session,
      notifier: self.notifier,
    })
  }
}

impl ApiClient {
  pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
    ApiClientBuilder {
      base_url: base_url.into(),
      transport: None,
      timeout: None,
      session: Session::anonymous(),
      notifier: Arc::new(LogNotifier),
      known_missing: Vec::new(),
      fallbacks: None,
    }
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  pub fn missing(&self) -> &MissingEndpoints {
    &self.missing
  }

  pub fn notifier(&self) -> &Arc<dyn Notifier> {
    &self.notifier
  }

  pub fn url_for(&self, endpoint: &str) -> String {
    format_api_url(&self.base_url, endpoint)
  }

  pub async fn get(&self, endpoint: &str) -> ApiResponse {
    self
      .execute(Method::Get, endpoint, RequestBody::Empty, true)
      .await
  }

  /// GET that skips the missing-endpoint short-circuit so the fallback layer
  /// can answer for optional endpoints.
  pub async fn get_soft(&self, endpoint: &str) -> ApiResponse {
    self
      .execute(Method::Get, endpoint, RequestBody::Empty, false)
      .await
  }

  pub async fn post(&self, endpoint: &str, body: &Value) -> ApiResponse {
    self.post_excluding(endpoint, body, &[]).await
  }

  /// POST with extra keys stripped from the body besides the non-schema list.
  pub async fn post_excluding(&self, endpoint: &str, body: &Value, exclude: &[&str]) -> ApiResponse {
    let body = sanitize_api_data(body, exclude);
    self
      .execute(Method::Post, endpoint, RequestBody::Json(body), false)
      .await
  }

  pub async fn put(&self, endpoint: &str, body: &Value) -> ApiResponse {
    self.put_excluding(endpoint, body, &[]).await
  }

  pub async fn put_excluding(&self, endpoint: &str, body: &Value, exclude: &[&str]) -> ApiResponse {
    let body = sanitize_api_data(body, exclude);
    self
      .execute(Method::Put, endpoint, RequestBody::Json(body), false)
      .await
  }

  pub async fn delete(&self, endpoint: &str) -> ApiResponse {
    self
      .execute(Method::Delete, endpoint, RequestBody::Empty, false)
      .await
  }

  /// Multipart POST. The content type and boundary come from the transport.
  pub async fn upload(&self, endpoint: &str, form: MultipartForm) -> ApiResponse {
    self
      .execute(Method::Post, endpoint, RequestBody::Multipart(form), false)
      .await
  }

  pub async fn get_as<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResponse<T> {
    self.get(endpoint).await.decode()
  }

  pub async fn post_as<B, T>(&self, endpoint: &str, body: &B, exclude: &[&str]) -> ApiResponse<T>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    match serde_json::to_value(body) {
      Ok(value) => self.post_excluding(endpoint, &value, exclude).await.decode(),
      Err(e) => ApiResponse::failure(None, ApiError::Decode(e.to_string())),
    }
  }

  pub async fn put_as<B, T>(&self, endpoint: &str, body: &B, exclude: &[&str]) -> ApiResponse<T>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    match serde_json::to_value(body) {
      Ok(value) => self.put_excluding(endpoint, &value, exclude).await.decode(),
      Err(e) => ApiResponse::failure(None, ApiError::Decode(e.to_string())),
    }
  }

  async fn execute(
    &self,
    method: Method,
    endpoint: &str,
    body: RequestBody,
    short_circuit_missing: bool,
  ) -> ApiResponse {
    if endpoint.contains("undefined") || endpoint.contains("null") {
      warn!(method = method.as_str(), endpoint, "Refusing request with unset id in endpoint");
      self.notifier.notify(
        Severity::Error,
        &format!("Invalid request: {} has a missing id", endpoint),
      );
      return ApiResponse::failure(None, ApiError::InvalidEndpoint(endpoint.to_string()));
    }

    let key = clean_endpoint(&self.base_url, endpoint);
    if short_circuit_missing && self.missing.has(&key) {
      debug!(endpoint, "Skipping request to known-missing endpoint");
      return ApiResponse::failure(Some(404), ApiError::KnownMissing(key));
    }

    let url = self.url_for(endpoint);
    let mut request = HttpRequest::new(method, url).with_header("Accept", "application/json");
    if let Some(authorization) = self.session.authorization() {
      request = request.with_header("Authorization", authorization);
    }
    let request = request.with_body(body);

    debug!(method = method.as_str(), url = %request.url, "Sending request");
    let response = match self.transport.send(request).await {
      Ok(response) => response,
      Err(e) => {
        warn!(method = method.as_str(), endpoint, error = %e, "Request failed");
        return ApiResponse::failure(None, ApiError::Network(e.to_string()));
      }
    };

    if !response.is_success() {
      if method == Method::Get && response.status == 404 {
        self.missing.add(&key);
      }
      return error_response(method, &response);
    }

    let parsed = match method {
      Method::Put => Some(parse_lenient(&response)),
      _ => parse_strict(&response),
    };
    match parsed {
      Some(data) => {
        let source = if response.synthetic {
          DataSource::Fallback
        } else {
          DataSource::Network
        };
        ApiResponse::success(response.status, data).with_source(source)
      }
      None => {
        warn!(method = method.as_str(), endpoint, "Response body is not JSON");
        ApiResponse::failure(Some(response.status), ApiError::InvalidJson)
      }
    }
  }
}

/// JSON or bust. An empty body (204) is `null`.
fn parse_strict(response: &HttpResponse) -> Option<Value> {
  if response.body.iter().all(u8::is_ascii_whitespace) {
    return Some(Value::Null);
  }
  serde_json::from_slice(&response.body).ok()
}

/// PUT responses may be plain text; those become `{ "message": text }`.
fn parse_lenient(response: &HttpResponse) -> Value {
  if response.is_json() {
    if let Some(value) = parse_strict(response) {
      return value;
    }
  }
  let text = response.body_text();
  if text.trim().is_empty() {
    Value::Null
  } else {
    json!({ "message": text })
  }
}

/// Failure for a non-2xx response.
///
/// GET reports the bare status; writes prefer the server's `error` or
/// `message` field so validation errors reach the caller, then the status
/// reason phrase.
fn error_response(method: Method, response: &HttpResponse) -> ApiResponse {
  let body: Option<Value> = serde_json::from_slice(&response.body).ok();

  let server_message = body.as_ref().and_then(|b| {
    b.get("error")
      .or_else(|| b.get("message"))
      .and_then(Value::as_str)
      .map(String::from)
  });

  let status_text = Some(response.status_text.trim())
    .filter(|text| !text.is_empty())
    .map(String::from);

  let error = match (method, server_message.or(status_text)) {
    (Method::Get, _) | (_, None) => ApiError::http_status(response.status),
    (_, Some(message)) => ApiError::Http {
      status: response.status,
      message,
    },
  };

  ApiResponse::Failure {
    status: Some(response.status),
    error,
    data: body,
  }
}
