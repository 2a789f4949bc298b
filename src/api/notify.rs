//! User-facing notifications raised by the API layer.

use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
  Info,
  Warning,
  Error,
}

/// Sink for transient messages meant for the person at the keyboard.
pub trait Notifier: Send + Sync {
  fn notify(&self, severity: Severity, message: &str);
}

/// Routes notifications into the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn notify(&self, severity: Severity, message: &str) {
    match severity {
      Severity::Info => info!(notification = true, "{}", message),
      Severity::Warning => warn!(notification = true, "{}", message),
      Severity::Error => error!(notification = true, "{}", message),
    }
  }
}

/// Keeps every notification, for callers that render them later.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
  messages: Arc<Mutex<Vec<(Severity, String)>>>,
}

impl RecordingNotifier {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn messages(&self) -> Vec<(Severity, String)> {
    match self.messages.lock() {
      Ok(messages) => messages.clone(),
      Err(poisoned) => poisoned.into_inner().clone(),
    }
  }

  pub fn drain(&self) -> Vec<(Severity, String)> {
    match self.messages.lock() {
      Ok(mut messages) => std::mem::take(&mut *messages),
      Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
    }
  }
}

impl Notifier for RecordingNotifier {
  fn notify(&self, severity: Severity, message: &str) {
    match self.messages.lock() {
      Ok(mut messages) => messages.push((severity, message.to_string())),
      Err(poisoned) => poisoned
        .into_inner()
        .push((severity, message.to_string())),
    }
  }
}
