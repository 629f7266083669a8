use axum::http::{HeaderMap, HeaderValue, header};
use std::time::Duration;

// -----------------------------------------------------------------------------
// ----- Cookies ---------------------------------------------------------------

/// The value of cookie `name` across every `Cookie` header, if present and
/// non-empty.
pub fn session_id(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(name: &str, session_id: &str, max_age: Duration) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{name}={session_id}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        max_age.as_secs()
    ))
    .ok()
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
