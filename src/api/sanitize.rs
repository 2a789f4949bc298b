//! Outgoing payload sanitization.
//!
//! The server rejects writes that carry joined or computed columns, so those
//! keys are dropped from every POST/PUT body before it is serialized.

use serde_json::{Map, Value};
use tracing::debug;

/// Top-level keys that are never part of a writable schema.
///
/// Must match the server schema: a key listed here is silently dropped even
/// if the server would accept it.
pub const NON_SCHEMA_FIELDS: &[&str] = &[
  "dam_name",
  "sire_name",
  "dog_name",
  "customer_name",
  "owner_name",
  "dam_info",
  "sire_info",
  "dog_info",
  "customer_info",
  "litter_info",
  "puppy_info",
  "created_at",
  "updated_at",
];

/// Shallow copy of `data` without non-schema keys and without `extra` keys.
///
/// Only top-level keys of an object are inspected; nested objects and arrays
/// pass through unchanged, as do non-object values.
pub fn sanitize_api_data(data: &Value, extra: &[&str]) -> Value {
  match data {
    Value::Object(map) => Value::Object(sanitize_map(map, extra)),
    other => other.clone(),
  }
}

pub fn sanitize_map(map: &Map<String, Value>, extra: &[&str]) -> Map<String, Value> {
  map
    .iter()
    .filter(|(key, _)| {
      let excluded = is_excluded(key, extra);
      if excluded {
        debug!(field = %key, "Removing non-schema field from payload");
      }
      !excluded
    })
    .map(|(key, value)| (key.clone(), value.clone()))
    .collect()
}

fn is_excluded(key: &str, extra: &[&str]) -> bool {
  NON_SCHEMA_FIELDS.contains(&key) || extra.contains(&key)
}
