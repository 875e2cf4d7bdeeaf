use axum::http::{header::InvalidHeaderValue, HeaderMap, HeaderValue};

/// The refresh token travels only in this cookie, scoped to the refresh
/// endpoint, never in a JSON body or header.
pub const REFRESH_COOKIE: &str = "refresh_token";
pub const REFRESH_COOKIE_PATH: &str = "/api/auth/refresh";

pub fn refresh_cookie(token: &str, max_age_secs: u64) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{REFRESH_COOKIE}={token}; Path={REFRESH_COOKIE_PATH}; HttpOnly; SameSite=Strict; Max-Age={max_age_secs}"
    ))
}

pub fn clear_refresh_cookie() -> HeaderValue {
    HeaderValue::from_static(
        "refresh_token=; Path=/api/auth/refresh; HttpOnly; SameSite=Strict; Max-Age=0",
    )
}

/// Pull the refresh token out of the request Cookie header, if present.
pub fn extract_refresh_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        // Pairs without '=' are skipped, not fatal for the rest of the header.
        let Some((key, val)) = pair.trim().split_once('=') else {
            continue;
        };
        let val = val.trim();
        if key.trim() == REFRESH_COOKIE && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}
