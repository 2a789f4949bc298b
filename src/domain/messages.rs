use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::{ApiClient, ApiResponse};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
  pub id: i64,
  #[serde(default)]
  pub subject: Option<String>,
  #[serde(default)]
  pub customer_id: Option<i64>,
  #[serde(default)]
  pub customer_name: Option<String>,
  #[serde(default)]
  pub last_message: Option<String>,
  #[serde(default)]
  pub last_message_at: Option<String>,
  #[serde(default)]
  pub unread_count: u32,
  #[serde(default)]
  pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
  pub id: i64,
  pub conversation_id: i64,
  #[serde(default)]
  pub sender_id: Option<i64>,
  #[serde(default)]
  pub sender_name: Option<String>,
  #[serde(default)]
  pub content: String,
  #[serde(default)]
  pub is_read: bool,
  #[serde(default)]
  pub created_at: Option<String>,
}

/// Body of a new conversation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewConversation {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub customer_id: Option<i64>,
  pub subject: String,
  pub content: String,
}

fn conversation_endpoint(id: i64) -> String {
  format!("messages/conversations/{}", id)
}

pub async fn fetch_conversations(client: &ApiClient) -> ApiResponse<Vec<Conversation>> {
  client.get_as("messages/conversations").await
}

pub async fn fetch_conversation_messages(
  client: &ApiClient,
  conversation_id: i64,
) -> ApiResponse<Vec<Message>> {
  client
    .get_as(&conversation_endpoint(conversation_id))
    .await
}

pub async fn send_message(
  client: &ApiClient,
  conversation_id: i64,
  content: &str,
) -> ApiResponse<Message> {
  client
    .post(
      &conversation_endpoint(conversation_id),
      &json!({ "content": content }),
    )
    .await
    .decode()
}

pub async fn start_conversation(
  client: &ApiClient,
  conversation: &NewConversation,
) -> ApiResponse<Conversation> {
  client
    .post_as("messages/conversations", conversation, &[])
    .await
}

pub async fn mark_conversation_read(client: &ApiClient, conversation_id: i64) -> ApiResponse<Value> {
  client
    .put(
      &format!("{}/read", conversation_endpoint(conversation_id)),
      &json!({}),
    )
    .await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::testing::MockTransport;
  use crate::api::Method;
  use std::sync::Arc;

  const BASE: &str = "http://kennel.test/api";

  fn client(mock: &MockTransport) -> ApiClient {
    ApiClient::builder(BASE)
      .transport(Arc::new(mock.clone()))
      .build()
      .unwrap()
  }

  #[tokio::test]
  async fn test_fetch_conversations() {
    let mock = MockTransport::new();
    mock.json(
      Method::Get,
      &format!("{}/messages/conversations", BASE),
      200,
      json!([{ "id": 1, "subject": "Puppy inquiry", "unread_count": 2 }]),
    );

    let conversations = fetch_conversations(&client(&mock))
      .await
      .into_data()
      .unwrap();
    assert_eq!(conversations[0].unread_count, 2);
    assert_eq!(conversations[0].customer_name, None);
  }

  #[tokio::test]
  async fn test_send_message() {
    let mock = MockTransport::new();
    mock.json(
      Method::Post,
      &format!("{}/messages/conversations/1", BASE),
      201,
      json!({ "id": 33, "conversation_id": 1, "content": "Hello" }),
    );

    let message = send_message(&client(&mock), 1, "Hello").await;
    assert_eq!(message.data().unwrap().id, 33);
    assert_eq!(
      mock.last_request().unwrap().json_body(),
      Some(&json!({ "content": "Hello" }))
    );
  }

  #[tokio::test]
  async fn test_mark_read_accepts_plain_text() {
    let mock = MockTransport::new();
    mock.reply(
      Method::Put,
      &format!("{}/messages/conversations/1/read", BASE),
      crate::api::HttpResponse::text(200, "ok"),
    );

    let response = mark_conversation_read(&client(&mock), 1).await;
    assert_eq!(response.data(), Some(&json!({ "message": "ok" })));
  }
}
