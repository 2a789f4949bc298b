use super::collection::CollectionStore;
use crate::domain::Dog;

/// Cached dogs of the kennel.
pub type DogStore = CollectionStore<Dog>;

impl CollectionStore<Dog> {
  pub fn by_gender(&self, gender: &str) -> Vec<&Dog> {
    self
      .items()
      .iter()
      .filter(|dog| {
        dog
          .gender
          .as_deref()
          .is_some_and(|g| g.eq_ignore_ascii_case(gender))
      })
      .collect()
  }

  /// Dogs marked for breeding.
  pub fn breeding(&self) -> Vec<&Dog> {
    self
      .items()
      .iter()
      .filter(|dog| dog.is_breeding.unwrap_or(false))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::testing::MockTransport;
  use crate::api::{ApiClient, Method};
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;

  const BASE: &str = "http://kennel.test/api";

  fn store(mock: &MockTransport) -> DogStore {
    let client = ApiClient::builder(BASE)
      .transport(Arc::new(mock.clone()))
      .build()
      .unwrap();
    DogStore::new(client)
  }

  #[tokio::test]
  async fn test_refresh_and_filters() {
    let mock = MockTransport::new();
    mock.json(
      Method::Get,
      &format!("{}/dogs", BASE),
      200,
      json!([
        { "id": 1, "call_name": "Bella", "gender": "Female", "is_breeding": true },
        { "id": 2, "call_name": "Rex", "gender": "male" }
      ]),
    );
    let mut dogs = store(&mock);
    assert!(dogs.is_stale());

    assert!(dogs.refresh().await);
    assert!(!dogs.is_loading());
    assert_eq!(dogs.items().len(), 2);
    assert_eq!(dogs.by_gender("female")[0].call_name, "Bella");
    assert_eq!(dogs.breeding().len(), 1);
    assert_eq!(dogs.get(2).map(|d| d.call_name.as_str()), Some("Rex"));
  }

  #[tokio::test]
  async fn test_failed_refresh_keeps_items() {
    let mock = MockTransport::new();
    let url = format!("{}/dogs", BASE);
    mock.json(Method::Get, &url, 200, json!([{ "id": 1, "call_name": "Bella" }]));
    let mut dogs = store(&mock).with_stale_time(Duration::ZERO);
    dogs.refresh().await;

    mock.clear(Method::Get, &url);
    mock.json(Method::Get, &url, 500, json!({ "error": "boom" }));
    assert!(!dogs.refresh().await);
    assert_eq!(dogs.items().len(), 1);
    assert_eq!(dogs.error(), Some("HTTP error! status: 500"));
  }

  #[tokio::test]
  async fn test_mutations_update_cache() {
    let mock = MockTransport::new();
    mock.json(
      Method::Post,
      &format!("{}/dogs", BASE),
      201,
      json!({ "id": 5, "call_name": "Nova" }),
    );
    mock.json(
      Method::Put,
      &format!("{}/dogs/5", BASE),
      200,
      json!({ "id": 5, "call_name": "Nova", "color": "red" }),
    );
    mock.reply(
      Method::Delete,
      &format!("{}/dogs/5", BASE),
      crate::api::HttpResponse::empty(204),
    );
    let mut dogs = store(&mock);

    let nova = Dog {
      call_name: "Nova".to_string(),
      ..Default::default()
    };
    dogs.add(&nova).await;
    assert_eq!(dogs.get(5).unwrap().call_name, "Nova");

    let mut edited = dogs.get(5).unwrap().clone();
    edited.color = Some("red".to_string());
    dogs.edit(&edited).await;
    assert_eq!(dogs.get(5).unwrap().color.as_deref(), Some("red"));
    assert_eq!(dogs.items().len(), 1);

    assert!(dogs.remove(5).await.ok());
    assert!(dogs.items().is_empty());
    assert_eq!(dogs.error(), None);
  }

  #[tokio::test]
  async fn test_failed_mutation_sets_error() {
    let mock = MockTransport::new();
    mock.json(
      Method::Delete,
      &format!("{}/dogs/9", BASE),
      409,
      json!({ "error": "Dog has litters" }),
    );
    let mut dogs = store(&mock);

    assert!(!dogs.remove(9).await.ok());
    assert_eq!(dogs.error(), Some("Dog has litters"));
  }
}
