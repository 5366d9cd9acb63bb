//! Ordered header multimap.
//!
//! # Design Decisions
//! - Keys keep the literal casing they arrived with; `append` matches keys
//!   exactly, so `Accept` and `accept` are distinct entries
//! - Values under one key keep insertion order, duplicates included
//! - Values are raw bytes; only the log rendering decodes them, lossily
//! - `get_ignore_case` exists for lookups that HTTP defines as
//!   case-insensitive (content-type, host, x-request-id)

use axum::body::Bytes;
use axum::http::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};

/// Header multimap: key → ordered list of raw values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<Bytes>)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a textual value under `name`, creating the entry on first use.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.append_bytes(name, Bytes::from(value.into()));
    }

    /// Append a value exactly as it appeared on the wire.
    pub fn append_bytes(&mut self, name: impl Into<String>, value: impl Into<Bytes>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// All raw values stored under exactly `name`.
    pub fn get(&self, name: &str) -> Option<&[Bytes]> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_slice())
    }

    /// First value whose key matches `name` ignoring ASCII case, if it is UTF-8.
    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.first())
            .and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Iterate over `(name, values)` in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Bytes])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build from a transport header map, keeping value bytes untouched.
    pub fn from_header_map(map: &HeaderMap) -> Self {
        let mut headers = Self::new();
        for (name, value) in map.iter() {
            headers.append_bytes(name.as_str(), Bytes::copy_from_slice(value.as_bytes()));
        }
        headers
    }

    /// Convert into a transport header map, keeping every value in order.
    pub fn to_header_map(&self) -> Result<HeaderMap, InvalidHeader> {
        let mut map = HeaderMap::new();
        for (name, values) in self.iter() {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| InvalidHeader(name.to_string()))?;
            for value in values {
                let header_value = HeaderValue::from_maybe_shared(value.clone())
                    .map_err(|_| InvalidHeader(name.to_string()))?;
                map.append(header_name.clone(), header_value);
            }
        }
        Ok(map)
    }

    /// Render as a JSON object of `name → [values]`. Non-UTF-8 bytes are decoded lossily.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(k, v)| {
                (
                    k.clone(),
                    Value::Array(
                        v.iter()
                            .map(|b| Value::String(String::from_utf8_lossy(b).into_owned()))
                            .collect(),
                    ),
                )
            })
            .collect();
        Value::Object(map)
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (k, v) in iter {
            headers.append(k, v);
        }
        headers
    }
}

/// A header name or value that the transport layer refuses.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid header `{0}`")]
pub struct InvalidHeader(pub String);
