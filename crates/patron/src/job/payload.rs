//! Keyed job payload

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mapping from string key to opaque JSON value
///
/// Read-only once the job is enqueued. Only the handler looks inside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(HashMap<String, Value>);

impl Payload {
    /// Create an empty payload
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Look up a value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over entries in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<HashMap<String, Value>> for Payload {
    fn from(map: HashMap<String, Value>) -> Self {
        Self(map)
    }
}

impl<K, V> FromIterator<(K, V)> for Payload
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_from_iter() {
        let payload: Payload = [("name", "HTTP Request"), ("dest_url", "http://localhost:8080/")]
            .into_iter()
            .collect();

        assert_eq!(payload.len(), 2);
        assert_eq!(payload.get("name"), Some(&json!("HTTP Request")));
        assert!(payload.get("missing").is_none());
    }

    #[test]
    fn test_payload_deserializes_from_object() {
        let payload: Payload =
            serde_json::from_value(json!({"name": "job", "retries": 3})).unwrap();

        assert!(payload.contains_key("name"));
        assert_eq!(payload.get("retries"), Some(&json!(3)));
    }
}
