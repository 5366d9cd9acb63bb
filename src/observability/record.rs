//! Structured transaction records.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// Which side of a transaction a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogEvent {
    Request,
    Response,
}

impl LogEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogEvent::Request => "REQUEST",
            LogEvent::Response => "RESPONSE",
        }
    }
}

impl std::fmt::Display for LogEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered `field → value` pairs for one event.
///
/// Values are limited to what `serde_json::Value` can hold: strings,
/// numbers, nested maps and lists. Field order is insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogRecord {
    fields: Vec<(&'static str, Value)>,
}

impl LogRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing an earlier value in place.
    pub fn insert(&mut self, key: &'static str, value: impl Into<Value>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Convenience for string-valued fields.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(k, _)| *k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for LogRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_order_and_replaces() {
        let mut record = LogRecord::new();
        record.insert("request_id", "r-1");
        record.insert("method", "GET");
        record.insert("request_id", "r-2");

        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["request_id", "method"]);
        assert_eq!(record.get_str("request_id"), Some("r-2"));
    }

    #[test]
    fn serializes_as_flat_object_in_order() {
        let mut record = LogRecord::new();
        record.insert("status_code", "200 OK");
        record.insert("turnaround_time", 50);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"status_code":"200 OK","turnaround_time":50}"#);
    }
}
