//! Per-delivery locals.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{Format, MailError, Result};

/// Reserved key selecting a single format to render.
pub const FORMAT_KEY: &str = "format";

/// Reserved key overriding the configured charset.
pub const CHARSET_KEY: &str = "charset";

const RESERVED_KEYS: &[&str] = &[FORMAT_KEY, CHARSET_KEY];

/// Caller-supplied context for one delivery.
///
/// Locals feed deferred header fields, pre-delivery hooks and templates.
/// The reserved `format` and `charset` keys steer the delivery itself and
/// are never exposed to templates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Locals {
    values: Map<String, Value>,
}

impl Locals {
    /// Create empty locals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build locals from any serializable map-like value.
    ///
    /// Non-object values are rejected.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
        match serde_json::to_value(value)? {
            Value::Object(values) => Ok(Self { values }),
            other => Err(MailError::Serialization(format!(
                "Locals must serialize to an object, got: {}",
                other
            ))),
        }
    }

    /// Add a value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Request a single format.
    pub fn format(self, format: impl Into<Format>) -> Self {
        let format: Format = format.into();
        self.with(FORMAT_KEY, format.as_str())
    }

    /// Override the charset.
    pub fn charset(self, charset: impl Into<String>) -> Self {
        self.with(CHARSET_KEY, charset.into())
    }

    /// Get a value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Get a value, failing with [`MailError::MissingLocal`] when absent.
    pub fn fetch(&self, key: &str) -> Result<&Value> {
        self.values
            .get(key)
            .ok_or_else(|| MailError::MissingLocal(key.to_string()))
    }

    /// Get a string value, failing when absent or not a string.
    pub fn fetch_str(&self, key: &str) -> Result<&str> {
        self.fetch(key)?
            .as_str()
            .ok_or_else(|| MailError::MissingLocal(format!("{} (expected a string)", key)))
    }

    /// Check if a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The explicitly requested format, if any.
    pub fn requested_format(&self) -> Option<Format> {
        self.values
            .get(FORMAT_KEY)
            .and_then(Value::as_str)
            .map(Format::from)
    }

    /// The explicitly requested charset, if any.
    pub fn requested_charset(&self) -> Option<&str> {
        self.values.get(CHARSET_KEY).and_then(Value::as_str)
    }

    /// The locals exposed to templates: everything but the reserved keys.
    pub fn template_context(&self) -> Map<String, Value> {
        self.values
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Number of entries, reserved keys included.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Map<String, Value>> for Locals {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Locals {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reserved_keys_are_stripped() {
        let locals = Locals::new()
            .with("name", "Luca")
            .format("txt")
            .charset("iso-2022-jp");

        let context = locals.template_context();
        assert_eq!(context.len(), 1);
        assert_eq!(context.get("name"), Some(&json!("Luca")));
        assert_eq!(locals.requested_format(), Some(Format::Txt));
        assert_eq!(locals.requested_charset(), Some("iso-2022-jp"));
    }

    #[test]
    fn test_fetch_missing_local() {
        let locals = Locals::new();
        match locals.fetch("user") {
            Err(MailError::MissingLocal(key)) => assert_eq!(key, "user"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_from_serialize() {
        let locals = Locals::from_serialize(&json!({"user": {"name": "Ada"}})).unwrap();
        assert_eq!(locals.fetch("user").unwrap()["name"], "Ada");

        assert!(Locals::from_serialize(&json!(["not", "a", "map"])).is_err());
    }
}
