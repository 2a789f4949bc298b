//! Photos and documents attached to dogs, litters and puppies.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::{ApiClient, ApiError, ApiResponse, FilePart, MultipartForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
  Dog,
  Litter,
  Puppy,
}

impl EntityType {
  pub fn as_str(&self) -> &'static str {
    match self {
      EntityType::Dog => "dog",
      EntityType::Litter => "litter",
      EntityType::Puppy => "puppy",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "dog" | "dogs" => Some(EntityType::Dog),
      "litter" | "litters" => Some(EntityType::Litter),
      "puppy" | "puppies" => Some(EntityType::Puppy),
      _ => None,
    }
  }
}

impl fmt::Display for EntityType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Photo {
  pub id: i64,
  #[serde(default)]
  pub entity_type: Option<EntityType>,
  #[serde(default)]
  pub entity_id: Option<i64>,
  #[serde(default)]
  pub url: Option<String>,
  #[serde(default)]
  pub thumbnail_url: Option<String>,
  #[serde(default)]
  pub caption: Option<String>,
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub order: Option<i64>,
  #[serde(default)]
  pub is_cover: bool,
  #[serde(default)]
  pub created_at: Option<String>,
}

/// Editable photo metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhotoMeta {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub caption: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub order: Option<i64>,
}

/// A photo about to be uploaded.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
  pub file: FilePart,
  pub entity_type: EntityType,
  pub entity_id: i64,
  pub meta: PhotoMeta,
  pub is_cover: bool,
}

impl PhotoUpload {
  pub fn new(file: FilePart, entity_type: EntityType, entity_id: i64) -> Self {
    Self {
      file,
      entity_type,
      entity_id,
      meta: PhotoMeta::default(),
      is_cover: false,
    }
  }

  pub fn into_form(self) -> MultipartForm {
    let mut file = self.file;
    file.field = "file".to_string();

    let mut form = MultipartForm::new()
      .file(file)
      .text("entity_type", self.entity_type.as_str())
      .text("entity_id", self.entity_id.to_string());
    if let Some(caption) = self.meta.caption {
      form = form.text("caption", caption);
    }
    if let Some(title) = self.meta.title {
      form = form.text("title", title);
    }
    if let Some(description) = self.meta.description {
      form = form.text("description", description);
    }
    if let Some(order) = self.meta.order {
      form = form.text("order", order.to_string());
    }
    form.text("is_cover", self.is_cover.to_string())
  }
}

pub async fn fetch_photos(
  client: &ApiClient,
  entity_type: EntityType,
  entity_id: i64,
) -> ApiResponse<Vec<Photo>> {
  client
    .get_as(&format!("photos/{}/{}", entity_type, entity_id))
    .await
}

pub async fn upload_photo(client: &ApiClient, upload: PhotoUpload) -> ApiResponse<Photo> {
  client
    .upload("photos/upload", upload.into_form())
    .await
    .decode()
}

pub async fn update_photo(client: &ApiClient, id: i64, meta: &PhotoMeta) -> ApiResponse<Value> {
  match serde_json::to_value(meta) {
    Ok(body) => client.put(&format!("photos/{}", id), &body).await,
    Err(e) => ApiResponse::failure(None, ApiError::Decode(e.to_string())),
  }
}

pub async fn set_cover_photo(client: &ApiClient, id: i64) -> ApiResponse<Value> {
  client
    .put(&format!("photos/{}/cover", id), &json!({}))
    .await
}

pub async fn delete_photo(client: &ApiClient, id: i64) -> ApiResponse<Value> {
  client.delete(&format!("photos/{}", id)).await
}

/// Upload a contract or other document for an entity.
pub async fn upload_document(
  client: &ApiClient,
  file: FilePart,
  entity_type: &str,
  entity_id: i64,
  title: Option<&str>,
) -> ApiResponse<Value> {
  let mut file = file;
  file.field = "file".to_string();

  let mut form = MultipartForm::new()
    .file(file)
    .text("entity_type", entity_type)
    .text("entity_id", entity_id.to_string());
  if let Some(title) = title {
    form = form.text("title", title);
  }
  client.upload("documents/upload", form).await
}
