//! Scripted transport for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use super::transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};

type Reply = Result<HttpResponse, TransportError>;

/// Replies per `(method, url)`. The last queued reply for a route repeats;
/// an unscripted route behaves like an unreachable server.
#[derive(Clone, Default)]
pub struct MockTransport {
  routes: Arc<Mutex<HashMap<(Method, String), VecDeque<Reply>>>>,
  requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockTransport {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn reply(&self, method: Method, url: &str, response: HttpResponse) -> &Self {
    self.push(method, url, Ok(response));
    self
  }

  pub fn json(&self, method: Method, url: &str, status: u16, body: Value) -> &Self {
    self.reply(method, url, HttpResponse::json(status, &body))
  }

  pub fn fail(&self, method: Method, url: &str, message: &str) -> &Self {
    self.push(method, url, Err(TransportError(message.to_string())));
    self
  }

  /// Forget the replies scripted for a route.
  pub fn clear(&self, method: Method, url: &str) -> &Self {
    self.routes.lock().unwrap().remove(&(method, url.to_string()));
    self
  }

  fn push(&self, method: Method, url: &str, reply: Reply) {
    self
      .routes
      .lock()
      .unwrap()
      .entry((method, url.to_string()))
      .or_default()
      .push_back(reply);
  }

  pub fn requests(&self) -> Vec<HttpRequest> {
    self.requests.lock().unwrap().clone()
  }

  pub fn request_count(&self) -> usize {
    self.requests.lock().unwrap().len()
  }

  pub fn count_for(&self, method: Method, url: &str) -> usize {
    self
      .requests
      .lock()
      .unwrap()
      .iter()
      .filter(|r| r.method == method && r.url == url)
      .count()
  }

  pub fn last_request(&self) -> Option<HttpRequest> {
    self.requests.lock().unwrap().last().cloned()
  }
}

#[async_trait]
impl Transport for MockTransport {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
    let key = (request.method, request.url.clone());
    self.requests.lock().unwrap().push(request);

    let mut routes = self.routes.lock().unwrap();
    match routes.get_mut(&key) {
      Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
      Some(queue) if queue.len() == 1 => queue.front().cloned().unwrap(),
      _ => Err(TransportError(format!(
        "error sending request for url ({})",
        key.1
      ))),
    }
  }
}
