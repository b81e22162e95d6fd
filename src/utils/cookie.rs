use axum::http::{header, HeaderMap};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Pull a named cookie out of the request headers. The identity provider
/// sets the cookie; this side only reads it.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie_header| {
            cookie_header.split(';').find_map(|cookie| {
                let mut parts = cookie.trim().splitn(2, '=');
                let key = parts.next()?.trim();
                let value = parts.next()?.trim();
                if key == name {
                    Some(value.to_string())
                } else {
                    None
                }
            })
        })
}
