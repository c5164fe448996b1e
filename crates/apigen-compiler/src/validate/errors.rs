//! Accumulated request-time field errors.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

/// One invalid field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub message: String,
    /// The offending raw value, when there was one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

/// Field-level errors keyed by parameter name or dotted/indexed path
/// (`user.tags[1]`), in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors {
    errors: IndexMap<String, FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error. The first error for a key is kept.
    pub fn add(&mut self, key: impl Into<String>, message: impl Into<String>, value: Option<serde_json::Value>) {
        self.errors.entry(key.into()).or_insert_with(|| FieldError {
            message: message.into(),
            value,
        });
    }

    pub fn get(&self, key: &str) -> Option<&FieldError> {
        self.errors.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.errors.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldError)> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(|k| k.as_str())
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invalid field(s)", self.errors.len())?;
        for (key, error) in &self.errors {
            write!(f, "; {}: {}", key, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_error_per_key_wins() {
        let mut errors = FieldErrors::new();
        errors.add("id", "not a valid integer", Some(json!("abc")));
        errors.add("id", "something else", None);
        errors.add("name", "'name' is required", None);

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("id").unwrap().message, "not a valid integer");
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["id", "name"]);
    }

    #[test]
    fn test_display_and_serialize() {
        let mut errors = FieldErrors::new();
        errors.add("user.age", "not a valid number", Some(json!("x")));

        assert_eq!(errors.to_string(), "1 invalid field(s); user.age: not a valid number");
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({ "user.age": { "message": "not a valid number", "value": "x" } })
        );
    }
}
