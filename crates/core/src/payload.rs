use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// A structured JSON payload. Always an object at the top level.
///
/// The store treats the contents as opaque; only the top-level shape is
/// enforced here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Payload(Map<String, Value>);

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Payload {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(CoreError::InvalidPayload(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, CoreError> {
        let value: Value =
            serde_json::from_str(s).map_err(|e| CoreError::Serialization(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn to_json_string(&self) -> Result<String, CoreError> {
        serde_json::to_string(&self.0).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Require `key` to hold a non-blank string.
    pub fn require_str(&self, key: &str) -> Result<&str, CoreError> {
        match self.0.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
            Some(Value::String(_)) => Err(CoreError::InvalidPayload(format!(
                "field {key:?} must not be blank"
            ))),
            Some(other) => Err(CoreError::InvalidPayload(format!(
                "field {key:?} must be a string, got {}",
                json_kind(other)
            ))),
            None => Err(CoreError::InvalidPayload(format!("missing field {key:?}"))),
        }
    }
}

impl TryFrom<Value> for Payload {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<Payload> for Value {
    fn from(payload: Payload) -> Self {
        payload.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_objects() {
        let p = Payload::from_value(json!({"title": "X", "items": [1, 2]})).unwrap();
        assert_eq!(p.get_str("title"), Some("X"));
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn rejects_primitives_and_arrays() {
        for value in [json!(null), json!(1), json!("text"), json!(true), json!([{"a": 1}])] {
            let err = Payload::from_value(value).unwrap_err();
            assert!(matches!(err, CoreError::InvalidPayload(_)));
        }
    }

    #[test]
    fn deserialize_enforces_object() {
        assert!(serde_json::from_str::<Payload>(r#"{"a":1}"#).is_ok());
        assert!(serde_json::from_str::<Payload>("[1,2,3]").is_err());
    }

    #[test]
    fn require_str_reports_missing_and_blank() {
        let p = Payload::new().with("name", "  ").with("age", 3);
        assert!(p.require_str("name").is_err());
        assert!(p.require_str("age").is_err());
        assert!(p.require_str("role").is_err());

        let p = Payload::new().with("name", "Jana");
        assert_eq!(p.require_str("name").unwrap(), "Jana");
    }

    #[test]
    fn json_string_round_trip_preserves_nesting() {
        let p = Payload::from_value(json!({"faq": [{"q": "Why?", "a": "Because."}]})).unwrap();
        let s = p.to_json_string().unwrap();
        assert_eq!(Payload::from_json_str(&s).unwrap(), p);
    }
}
