//! HTTP transport seam.
//!
//! The client talks to a [`Transport`] instead of reqwest directly so the
//! fallback layer can wrap it and tests can script responses.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
  Get,
  Post,
  Put,
  Delete,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
    }
  }
}

/// A file attached to a multipart request.
#[derive(Debug, Clone)]
pub struct FilePart {
  pub field: String,
  pub file_name: String,
  pub content_type: Option<String>,
  pub bytes: Vec<u8>,
}

impl FilePart {
  pub fn new(field: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
    let file_name = file_name.into();
    Self {
      field: field.into(),
      content_type: mime_guess::from_path(&file_name).first_raw().map(String::from),
      file_name,
      bytes,
    }
  }

  /// Read a file from disk, naming the part after the file.
  pub async fn from_path(field: impl Into<String>, path: &Path) -> Result<Self> {
    let bytes = tokio::fs::read(path)
      .await
      .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
    let file_name = path
      .file_name()
      .and_then(|n| n.to_str())
      .ok_or_else(|| eyre!("Invalid file name: {}", path.display()))?;
    Ok(Self::new(field, file_name, bytes))
  }
}

/// `multipart/form-data` body. The boundary is left to the transport.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
  pub fields: Vec<(String, String)>,
  pub files: Vec<FilePart>,
}

impl MultipartForm {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.fields.push((name.into(), value.into()));
    self
  }

  pub fn file(mut self, part: FilePart) -> Self {
    self.files.push(part);
    self
  }

  pub fn field(&self, name: &str) -> Option<&str> {
    self
      .fields
      .iter()
      .find(|(key, _)| key == name)
      .map(|(_, value)| value.as_str())
  }
}

#[derive(Debug, Clone)]
pub enum RequestBody {
  Empty,
  Json(Value),
  Multipart(MultipartForm),
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
  pub method: Method,
  pub url: String,
  pub headers: Vec<(String, String)>,
  pub body: RequestBody,
}

impl HttpRequest {
  pub fn new(method: Method, url: impl Into<String>) -> Self {
    Self {
      method,
      url: url.into(),
      headers: Vec::new(),
      body: RequestBody::Empty,
    }
  }

  pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.push((name.into(), value.into()));
    self
  }

  pub fn with_body(mut self, body: RequestBody) -> Self {
    self.body = body;
    self
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(key, _)| key.eq_ignore_ascii_case(name))
      .map(|(_, value)| value.as_str())
  }

  pub fn json_body(&self) -> Option<&Value> {
    match &self.body {
      RequestBody::Json(value) => Some(value),
      _ => None,
    }
  }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
  pub status: u16,
  pub status_text: String,
  pub content_type: Option<String>,
  pub body: Vec<u8>,
  /// Produced by the fallback layer rather than the server
  pub synthetic: bool,
}

impl HttpResponse {
  pub fn json(status: u16, value: &Value) -> Self {
    Self {
      status,
      status_text: String::new(),
      content_type: Some("application/json".to_string()),
      body: value.to_string().into_bytes(),
      synthetic: false,
    }
  }

  pub fn text(status: u16, text: &str) -> Self {
    Self {
      status,
      status_text: String::new(),
      content_type: Some("text/plain".to_string()),
      body: text.as_bytes().to_vec(),
      synthetic: false,
    }
  }

  pub fn empty(status: u16) -> Self {
    Self {
      status,
      status_text: String::new(),
      content_type: None,
      body: Vec::new(),
      synthetic: false,
    }
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  pub fn is_json(&self) -> bool {
    self
      .content_type
      .as_deref()
      .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
  }

  pub fn body_text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }
}

/// Failure before any HTTP response was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Transport backed by a shared reqwest client.
#[derive(Clone)]
pub struct ReqwestTransport {
  client: reqwest::Client,
}

impl ReqwestTransport {
  pub fn new(timeout: Option<Duration>) -> Result<Self> {
    let mut builder = reqwest::Client::builder().user_agent(concat!(
      env!("CARGO_PKG_NAME"),
      "/",
      env!("CARGO_PKG_VERSION")
    ));
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }
    let client = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;
    Ok(Self { client })
  }
}

#[async_trait]
impl Transport for ReqwestTransport {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
    let method = match request.method {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Put => reqwest::Method::PUT,
      Method::Delete => reqwest::Method::DELETE,
    };

    let mut builder = self.client.request(method, &request.url);
    for (name, value) in &request.headers {
      builder = builder.header(name.as_str(), value.as_str());
    }

    builder = match request.body {
      RequestBody::Empty => builder,
      RequestBody::Json(value) => builder.json(&value),
      RequestBody::Multipart(form) => builder.multipart(into_reqwest_form(form)?),
    };

    let response = builder
      .send()
      .await
      .map_err(|e| TransportError(e.to_string()))?;

    let status = response.status();
    let content_type = response
      .headers()
      .get(reqwest::header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(String::from);
    let body = response
      .bytes()
      .await
      .map_err(|e| TransportError(e.to_string()))?;

    Ok(HttpResponse {
      status: status.as_u16(),
      status_text: status.canonical_reason().unwrap_or_default().to_string(),
      content_type,
      body: body.to_vec(),
      synthetic: false,
    })
  }
}

fn into_reqwest_form(form: MultipartForm) -> Result<reqwest::multipart::Form, TransportError> {
  let mut out = reqwest::multipart::Form::new();
  for (name, value) in form.fields {
    out = out.text(name, value);
  }
  for file in form.files {
    let mut part = reqwest::multipart::Part::bytes(file.bytes).file_name(file.file_name);
    if let Some(content_type) = file.content_type {
      part = part
        .mime_str(&content_type)
        .map_err(|e| TransportError(format!("Invalid content type {}: {}", content_type, e)))?;
    }
    out = out.part(file.field, part);
  }
  Ok(out)
}
