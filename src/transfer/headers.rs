//! Download response headers.

use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue};

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Headers shared by both transfer modes.
pub fn download_headers(name: &str, size: u64) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(3);
    headers.insert(CONTENT_DISPOSITION, content_disposition(name));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
    headers
}

/// `attachment; filename="<name>"` with quotes and backslashes escaped.
///
/// Falls back to a bare `attachment` if the name cannot be carried in a
/// header (control characters).
pub fn content_disposition(name: &str) -> HeaderValue {
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_bytes(format!("attachment; filename=\"{escaped}\"").as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
