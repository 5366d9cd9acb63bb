//! Body field policy: structured JSON when possible, opaque text otherwise.

use serde_json::{Map, Value};

use crate::http::capture::CapturedBody;

/// True for `application/json` and `application/<x>+json`, parameters ignored.
pub fn is_json_content_type(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Value for the record's `body` field.
///
/// A JSON object body under a JSON content type is embedded as a nested
/// map. Anything else, including a JSON parse failure, becomes a string.
pub fn body_field(body: &CapturedBody, content_type: Option<&str>) -> Value {
    if is_json_content_type(content_type) {
        if let Ok(map) = serde_json::from_slice::<Map<String, Value>>(body.loggable()) {
            return Value::Object(map);
        }
    }
    Value::String(body.loggable_text().into_owned())
}
