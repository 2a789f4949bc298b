//! Background refresh of conversations while a user is signed in.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::auth::AuthState;
use crate::api::ApiClient;
use crate::domain::messages::{self, Conversation, Message};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Results published by the poller.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
  Conversations(Vec<Conversation>),
  Messages {
    conversation_id: i64,
    messages: Vec<Message>,
  },
  /// A poll request failed; polling continues
  Failed(String),
  /// The poller exited and will send nothing more
  Stopped,
}

/// Handle to the polling task. Dropping it stops the task.
pub struct MessagePoller {
  handle: JoinHandle<()>,
}

impl MessagePoller {
  /// Poll every `period`, starting one period from now.
  ///
  /// Each tick fetches the conversation list and, when `active` holds a
  /// conversation id, that conversation's messages. The task ends when
  /// `auth` reports signed out, when the auth sender goes away, or when the
  /// event receiver is dropped.
  pub fn spawn(
    client: ApiClient,
    mut auth: watch::Receiver<AuthState>,
    active: watch::Receiver<Option<i64>>,
    period: Duration,
  ) -> (Self, mpsc::UnboundedReceiver<PollEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
      let mut ticker = interval_at(Instant::now() + period, period);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      info!(period_secs = period.as_secs(), "Message polling started");

      loop {
        if !auth.borrow_and_update().authenticated {
          break;
        }
        tokio::select! {
          _ = ticker.tick() => {
            let conversation = *active.borrow();
            if !poll_once(&client, conversation, &tx).await {
              break;
            }
          }
          changed = auth.changed() => {
            if changed.is_err() {
              break;
            }
          }
        }
      }

      info!("Message polling stopped");
      let _ = tx.send(PollEvent::Stopped);
    });

    (Self { handle }, rx)
  }

  pub fn is_finished(&self) -> bool {
    self.handle.is_finished()
  }

  pub fn stop(self) {
    self.handle.abort();
  }
}

impl Drop for MessagePoller {
  fn drop(&mut self) {
    self.handle.abort();
  }
}

/// One poll round. Returns false once nobody is listening.
async fn poll_once(
  client: &ApiClient,
  conversation: Option<i64>,
  tx: &mpsc::UnboundedSender<PollEvent>,
) -> bool {
  debug!(?conversation, "Polling messages");
  let event = match messages::fetch_conversations(client).await.into_result() {
    Ok(list) => PollEvent::Conversations(list),
    Err(e) => PollEvent::Failed(e.to_string()),
  };
  if tx.send(event).is_err() {
    return false;
  }

  if let Some(conversation_id) = conversation {
    let event = match messages::fetch_conversation_messages(client, conversation_id)
      .await
      .into_result()
    {
      Ok(messages) => PollEvent::Messages {
        conversation_id,
        messages,
      },
      Err(e) => PollEvent::Failed(e.to_string()),
    };
    if tx.send(event).is_err() {
      return false;
    }
  }
  true
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::testing::MockTransport;
  use crate::api::Method;
  use serde_json::json;
  use std::sync::Arc;

  const BASE: &str = "http://kennel.test/api";

  fn setup() -> (MockTransport, ApiClient) {
    let mock = MockTransport::new();
    mock.json(
      Method::Get,
      &format!("{}/messages/conversations", BASE),
      200,
      json!([{ "id": 1, "subject": "Litter question" }]),
    );
    mock.json(
      Method::Get,
      &format!("{}/messages/conversations/1", BASE),
      200,
      json!([{ "id": 10, "conversation_id": 1, "content": "Hi" }]),
    );
    let client = ApiClient::builder(BASE)
      .transport(Arc::new(mock.clone()))
      .build()
      .unwrap();
    (mock, client)
  }

  #[tokio::test(start_paused = true)]
  async fn test_polls_every_period_until_logout() {
    let (mock, client) = setup();
    let (auth_tx, auth_rx) = watch::channel(AuthState::signed_in(None));
    let (_active_tx, active_rx) = watch::channel(Some(1));

    let start = Instant::now();
    let (_poller, mut events) =
      MessagePoller::spawn(client, auth_rx, active_rx, DEFAULT_POLL_INTERVAL);

    // First round after one period
    assert!(matches!(events.recv().await, Some(PollEvent::Conversations(_))));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(30) && elapsed < Duration::from_secs(31));
    assert!(matches!(
      events.recv().await,
      Some(PollEvent::Messages { conversation_id: 1, .. })
    ));
    assert_eq!(mock.request_count(), 2);

    assert!(matches!(events.recv().await, Some(PollEvent::Conversations(_))));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(60) && elapsed < Duration::from_secs(61));
    assert!(matches!(events.recv().await, Some(PollEvent::Messages { .. })));
    assert_eq!(mock.request_count(), 4);

    auth_tx.send_replace(AuthState::signed_out());
    assert_eq!(events.recv().await, Some(PollEvent::Stopped));
    assert_eq!(events.recv().await, None);

    tokio::time::advance(Duration::from_secs(120)).await;
    assert_eq!(mock.request_count(), 4);
  }

  #[tokio::test(start_paused = true)]
  async fn test_no_conversation_open_fetches_list_only() {
    let (mock, client) = setup();
    let (_auth_tx, auth_rx) = watch::channel(AuthState::signed_in(None));
    let (_active_tx, active_rx) = watch::channel(None);

    let (poller, mut events) =
      MessagePoller::spawn(client, auth_rx, active_rx, DEFAULT_POLL_INTERVAL);
    assert!(matches!(events.recv().await, Some(PollEvent::Conversations(_))));
    assert!(matches!(events.recv().await, Some(PollEvent::Conversations(_))));
    assert_eq!(mock.request_count(), 2);

    poller.stop();
    assert_eq!(events.recv().await, None);
  }

  #[tokio::test(start_paused = true)]
  async fn test_signed_out_never_polls() {
    let (mock, client) = setup();
    let (_auth_tx, auth_rx) = watch::channel(AuthState::signed_out());
    let (_active_tx, active_rx) = watch::channel(Some(1));

    let (_poller, mut events) =
      MessagePoller::spawn(client, auth_rx, active_rx, DEFAULT_POLL_INTERVAL);
    assert_eq!(events.recv().await, Some(PollEvent::Stopped));
    assert_eq!(mock.request_count(), 0);
  }
}
