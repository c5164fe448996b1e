//! Typed argument values produced by request validation.

use chrono::{DateTime, FixedOffset, NaiveDate};
use indexmap::IndexMap;
use serde::Serialize;

/// A validated, strongly-typed argument value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    Bytes(Vec<u8>),
    Array(Vec<TypedValue>),
    Object(IndexMap<String, TypedValue>),
    Null,
    /// Passed through without a schema.
    Any(serde_json::Value),
}

impl TypedValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TypedValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value of an integer or number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedValue::Number(n) => Some(*n),
            TypedValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[TypedValue]> {
        match self {
            TypedValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Field of an object value.
    pub fn get(&self, key: &str) -> Option<&TypedValue> {
        match self {
            TypedValue::Object(fields) => fields.get(key),
            _ => None,
        }
    }

    /// Converts back into JSON; dates use their ISO-8601 text form.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
