//! Response-shape normalization.
//!
//! The backends nest entity payloads inconsistently: `{bookings: [...]}`,
//! `{data: [...]}`, or a bare array. Extraction is an explicit ordered list
//! of probes where the first success wins; the order is fixed because some
//! backends overload `data` for other meanings, so the domain key must be
//! probed first.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;

type ListExtractor = fn(&Value, &str) -> Option<Vec<Value>>;

fn domain_key_array(payload: &Value, key: &str) -> Option<Vec<Value>> {
  payload.get(key)?.as_array().cloned()
}

fn data_array(payload: &Value, _key: &str) -> Option<Vec<Value>> {
  payload.get("data")?.as_array().cloned()
}

fn root_array(payload: &Value, _key: &str) -> Option<Vec<Value>> {
  payload.as_array().cloned()
}

const LIST_EXTRACTORS: &[ListExtractor] = &[domain_key_array, data_array, root_array];

/// Extract the canonical entity list from a raw payload.
///
/// Probes `payload[key]`, then `payload.data`, then the payload itself;
/// returns an empty list when nothing matches.
pub fn extract_list(payload: &Value, key: &str) -> Vec<Value> {
  LIST_EXTRACTORS
    .iter()
    .find_map(|extract| extract(payload, key))
    .unwrap_or_default()
}

/// Extract a single entity record from a raw payload.
///
/// Probes `payload[key]` as an object, then `payload.data` as an object,
/// then falls back to the payload itself.
pub fn extract_record(payload: &Value, key: &str) -> Value {
  if let Some(record) = payload.get(key).filter(|v| v.is_object()) {
    return record.clone();
  }
  if let Some(record) = payload.get("data").filter(|v| v.is_object()) {
    return record.clone();
  }
  payload.clone()
}

/// Extract and deserialize the entity list in one step.
pub fn parse_list<T: DeserializeOwned>(payload: &Value, key: &str) -> Result<Vec<T>> {
  let values = extract_list(payload, key);
  Ok(serde_json::from_value(Value::Array(values))?)
}

/// Extract and deserialize a single entity in one step.
pub fn parse_record<T: DeserializeOwned>(payload: &Value, key: &str) -> Result<T> {
  Ok(serde_json::from_value(extract_record(payload, key))?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn domain_key_shape() {
    let payload = json!({"bookings": [{"id": 1}, {"id": 2}]});
    let list = extract_list(&payload, "bookings");
    assert_eq!(list, vec![json!({"id": 1}), json!({"id": 2})]);
  }

  #[test]
  fn data_shape() {
    let payload = json!({"data": [{"id": 3}]});
    assert_eq!(extract_list(&payload, "bookings"), vec![json!({"id": 3})]);
  }

  #[test]
  fn bare_array_shape() {
    let payload = json!([{"id": 4}]);
    assert_eq!(extract_list(&payload, "bookings"), vec![json!({"id": 4})]);
  }

  #[test]
  fn empty_object_yields_empty_list() {
    assert!(extract_list(&json!({}), "bookings").is_empty());
  }

  #[test]
  fn domain_key_wins_over_data() {
    // Both present: the domain key must win, data may mean something else.
    let payload = json!({
      "bookings": [{"id": 1}],
      "data": {"pagination": {"total": 9}}
    });
    assert_eq!(extract_list(&payload, "bookings"), vec![json!({"id": 1})]);
  }

  #[test]
  fn record_probe_order() {
    let nested = json!({"booking": {"id": 7}});
    assert_eq!(extract_record(&nested, "booking"), json!({"id": 7}));

    let wrapped = json!({"data": {"id": 8}});
    assert_eq!(extract_record(&wrapped, "booking"), json!({"id": 8}));

    let bare = json!({"id": 9});
    assert_eq!(extract_record(&bare, "booking"), json!({"id": 9}));
  }

  #[test]
  fn extraction_is_idempotent() {
    let payload = json!({"teachers": [{"id": 1}]});
    let once = extract_list(&payload, "teachers");
    let twice = extract_list(&Value::Array(once.clone()), "teachers");
    assert_eq!(once, twice);
  }
}
