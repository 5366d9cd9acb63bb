//! Status code rendering for log records.

use axum::http::StatusCode;

/// `"<code> <NAME>"` for a recognized status, else the bare code.
///
/// NAME is the canonical reason phrase upper-cased with word separators
/// turned into underscores, e.g. `404 NOT_FOUND`.
pub fn status_line(code: u16) -> String {
    let reason = StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason());
    match reason {
        Some(reason) => format!("{} {}", code, reason_constant(reason)),
        None => code.to_string(),
    }
}

/// Leading digit class, e.g. `"2XX"`.
pub fn code_type(code: u16) -> String {
    let first = code.to_string().chars().next().unwrap_or('0');
    format!("{}XX", first)
}

fn reason_constant(reason: &str) -> String {
    reason
        .chars()
        .filter_map(|c| match c {
            ' ' | '-' => Some('_'),
            c if c.is_ascii_alphanumeric() => Some(c.to_ascii_uppercase()),
            _ => None,
        })
        .collect()
}
