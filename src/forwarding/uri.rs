//! Destination URI construction.

use axum::http::Uri;

use crate::forwarding::error::ForwardError;

/// `dest_host + path`, plus `"?" + query` when the query is non-empty.
///
/// The string is not normalized or re-encoded; it must already be a valid
/// absolute URI with a scheme and an authority.
pub fn build_destination_uri(
    dest_host: &str,
    path: &str,
    query: Option<&str>,
) -> Result<Uri, ForwardError> {
    let mut target = String::with_capacity(dest_host.len() + path.len() + 1);
    target.push_str(dest_host);
    target.push_str(path);
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(query);
    }

    let uri: Uri = target
        .parse()
        .map_err(|e: axum::http::uri::InvalidUri| invalid(&target, e.to_string()))?;

    if uri.scheme().is_none() {
        return Err(invalid(&target, "missing scheme"));
    }
    if uri.authority().is_none() {
        return Err(invalid(&target, "missing authority"));
    }
    Ok(uri)
}

fn invalid(uri: &str, reason: impl Into<String>) -> ForwardError {
    ForwardError::InvalidDestination {
        uri: uri.to_string(),
        reason: reason.into(),
    }
}
