//! Client identifier extraction.

use axum::http::HeaderMap;

/// Identifier shared by every client whose address cannot be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derive the rate limit key for a request.
///
/// Uses the first `X-Forwarded-For` entry, then `X-Real-IP`, then
/// [`UNKNOWN_CLIENT`]. All clients without either header share one bucket.
pub fn client_identifier(headers: &HeaderMap) -> String {
    header_value(headers, "x-forwarded-for")
        .and_then(|forwarded| forwarded.split(',').next())
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .or_else(|| {
            header_value(headers, "x-real-ip")
                .map(str::trim)
                .filter(|addr| !addr.is_empty())
        })
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
