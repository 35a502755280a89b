use axum::http::{header, HeaderMap, HeaderValue};
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime, UtcOffset};

use crate::config::CookieConfig;

const HTTP_DATE: &[FormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

fn render(cfg: &CookieConfig, value: &str, expires: OffsetDateTime) -> anyhow::Result<HeaderValue> {
    let expires = expires.to_offset(UtcOffset::UTC).format(HTTP_DATE)?;
    let mut cookie = format!(
        "{}={}; Path=/; Expires={}; HttpOnly; SameSite=None",
        cfg.name, value, expires
    );
    if cfg.secure {
        cookie.push_str("; Secure");
    }
    Ok(HeaderValue::from_str(&cookie)?)
}

/// `Set-Cookie` value carrying the session token until `expires`.
pub fn session_cookie(
    cfg: &CookieConfig,
    token: &str,
    expires: OffsetDateTime,
) -> anyhow::Result<HeaderValue> {
    render(cfg, token, expires)
}

/// Empty, already-expired cookie that makes the browser drop the session.
pub fn cleared_cookie(cfg: &CookieConfig) -> anyhow::Result<HeaderValue> {
    render(cfg, "", OffsetDateTime::UNIX_EPOCH)
}

/// Reads cookie `name` from the request's `Cookie` headers. Empty values count as absent.
pub fn token_from_headers<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}
