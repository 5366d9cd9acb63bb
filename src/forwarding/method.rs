//! Inbound method → upstream method.

use axum::http::Method;

use crate::forwarding::error::ForwardError;

/// Verbs the proxy relays. Matching is case-sensitive.
pub const RECOGNIZED_METHODS: [&str; 8] = [
    "GET", "HEAD", "POST", "PUT", "DELETE", "OPTIONS", "TRACE", "PATCH",
];

pub fn parse_method(method: &str) -> Result<Method, ForwardError> {
    if !RECOGNIZED_METHODS.contains(&method) {
        return Err(ForwardError::UnsupportedMethod(method.to_string()));
    }
    Method::from_bytes(method.as_bytes())
        .map_err(|_| ForwardError::UnsupportedMethod(method.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_verbs_map() {
        for verb in RECOGNIZED_METHODS {
            assert_eq!(parse_method(verb).unwrap().as_str(), verb);
        }
    }

    #[test]
    fn lowercase_and_unknown_are_rejected() {
        assert_eq!(
            parse_method("get"),
            Err(ForwardError::UnsupportedMethod("get".into()))
        );
        assert!(parse_method("PURGE").is_err());
        assert!(parse_method("CONNECT").is_err());
    }
}
