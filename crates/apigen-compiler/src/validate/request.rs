//! Raw per-request value bundle.

use std::collections::HashMap;

use indexmap::IndexMap;

/// Untyped values captured from one request: path captures, parsed query,
/// headers and the parsed body.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    path: HashMap<String, String>,
    query: IndexMap<String, Vec<String>>,
    /// Keyed by lowercased header name.
    headers: IndexMap<String, Vec<String>>,
    body: Option<serde_json::Value>,
}

impl RawRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a URL-encoded query string (a leading `?` is ignored).
    /// Repeated keys accumulate in order.
    pub fn from_query_string(query: &str) -> Result<Self, serde_urlencoded::de::Error> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query.trim_start_matches('?'))?;
        let mut request = Self::new();
        for (key, value) in pairs {
            request.query.entry(key).or_default().push(value);
        }
        Ok(request)
    }

    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path.insert(name.into(), value.into());
        self
    }

    /// Appends a query value; call repeatedly for repeated keys.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.entry(name.into()).or_default().push(value.into());
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path.get(name).map(|s| s.as_str())
    }

    /// The path capture as a one-element slice; empty when absent.
    pub(crate) fn path_values(&self, name: &str) -> &[String] {
        self.path.get(name).map(std::slice::from_ref).unwrap_or(&[])
    }

    /// All values for a query key; empty when absent.
    pub fn query_values(&self, name: &str) -> &[String] {
        self.query.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// All values for a header, looked up case-insensitively.
    pub fn header_values(&self, name: &str) -> &[String] {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// First value of a header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_values(name).first().map(|s| s.as_str())
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }
}
