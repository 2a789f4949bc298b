use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::auth::AuthState;
use super::poller::{MessagePoller, PollEvent};
use crate::api::{ApiClient, ApiError, ApiResponse};
use crate::domain::messages::{self, Conversation, Message};

/// Conversations and the messages of the open conversation.
pub struct MessageStore {
  client: ApiClient,
  conversations: Vec<Conversation>,
  messages: Vec<Message>,
  active: watch::Sender<Option<i64>>,
  error: Option<String>,
}

impl MessageStore {
  pub fn new(client: ApiClient) -> Self {
    let (active, _) = watch::channel(None);
    Self {
      client,
      conversations: Vec::new(),
      messages: Vec::new(),
      active,
      error: None,
    }
  }

  pub fn conversations(&self) -> &[Conversation] {
    &self.conversations
  }

  pub fn messages(&self) -> &[Message] {
    &self.messages
  }

  pub fn active_conversation(&self) -> Option<i64> {
    *self.active.borrow()
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn unread_total(&self) -> u32 {
    self.conversations.iter().map(|c| c.unread_count).sum()
  }

  /// Reload the conversation list and the open conversation.
  pub async fn refresh(&mut self) -> bool {
    let list = messages::fetch_conversations(&self.client).await;
    let mut ok = self.apply_result(list.into_result().map(PollEvent::Conversations));

    if let Some(conversation_id) = self.active_conversation() {
      let thread = messages::fetch_conversation_messages(&self.client, conversation_id).await;
      ok &= self.apply_result(thread.into_result().map(|messages| PollEvent::Messages {
        conversation_id,
        messages,
      }));
    }
    ok
  }

  /// Make `id` the open conversation, load its messages and mark it read.
  pub async fn open_conversation(&mut self, id: i64) -> ApiResponse<Vec<Message>> {
    self.active.send_replace(Some(id));
    self.messages.clear();

    let response = messages::fetch_conversation_messages(&self.client, id).await;
    match response.data() {
      Some(list) => {
        self.messages = list.clone();
        self.error = None;

        let read = messages::mark_conversation_read(&self.client, id).await;
        if read.ok() {
          if let Some(conversation) = self.conversations.iter_mut().find(|c| c.id == id) {
            conversation.unread_count = 0;
          }
        } else {
          debug!(conversation = id, "Could not mark conversation read");
        }
      }
      None => self.error = response.error().map(|e| e.to_string()),
    }
    response
  }

  pub fn close_conversation(&mut self) {
    self.active.send_replace(None);
    self.messages.clear();
  }

  /// Send a message to the open conversation.
  pub async fn send(&mut self, content: &str) -> ApiResponse<Message> {
    let conversation_id = match self.active_conversation() {
      Some(id) => id,
      None => {
        return ApiResponse::failure(
          None,
          ApiError::InvalidEndpoint("no conversation open".to_string()),
        )
      }
    };

    let response = messages::send_message(&self.client, conversation_id, content).await;
    match response.data() {
      Some(message) => {
        self.messages.push(message.clone());
        if let Some(conversation) = self
          .conversations
          .iter_mut()
          .find(|c| c.id == conversation_id)
        {
          conversation.last_message = Some(message.content.clone());
          conversation.last_message_at = message.created_at.clone();
        }
        self.error = None;
      }
      None => self.error = response.error().map(|e| e.to_string()),
    }
    response
  }

  /// Fold a poller event into the store.
  pub fn apply(&mut self, event: PollEvent) {
    match event {
      PollEvent::Conversations(list) => self.conversations = list,
      PollEvent::Messages {
        conversation_id,
        messages,
      } => {
        // Ignore a reply for a conversation closed since the poll began
        if self.active_conversation() == Some(conversation_id) {
          self.messages = messages;
        }
      }
      PollEvent::Failed(error) => self.error = Some(error),
      PollEvent::Stopped => {}
    }
  }

  /// Start polling while `auth` reports signed in.
  pub fn start_polling(
    &self,
    auth: watch::Receiver<AuthState>,
    period: Duration,
  ) -> (MessagePoller, mpsc::UnboundedReceiver<PollEvent>) {
    MessagePoller::spawn(self.client.clone(), auth, self.active.subscribe(), period)
  }

  fn apply_result(&mut self, result: Result<PollEvent, ApiError>) -> bool {
    match result {
      Ok(event) => {
        self.apply(event);
        true
      }
      Err(e) => {
        self.apply(PollEvent::Failed(e.to_string()));
        false
      }
    }
  }
}
