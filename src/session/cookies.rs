use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tracing::warn;

use crate::constants::{SESSION_COOKIE_CHUNK_SIZE, SESSION_COOKIE_MAX_AGE_SECS, SESSION_COOKIE_PREFIX};
use crate::error::{PortalError, Result};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub path: String,
    pub domain: Option<String>,
    pub max_age: Option<i64>,
    pub same_site: Option<SameSite>,
    pub http_only: bool,
    pub secure: bool,
}

impl Default for CookieOptions {
    /// The auth SDK reads these cookies from browser code too, so no HttpOnly.
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            max_age: Some(SESSION_COOKIE_MAX_AGE_SECS),
            same_site: Some(SameSite::Lax),
            http_only: false,
            secure: false,
        }
    }
}

/// One entry of a cookie batch: name, value and per-cookie options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieToSet {
    pub name: String,
    pub value: String,
    pub options: CookieOptions,
}

impl CookieToSet {
    pub fn new(name: impl Into<String>, value: impl Into<String>, options: CookieOptions) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            options,
        }
    }

    /// A directive telling the browser to drop the cookie.
    pub fn removal(name: impl Into<String>, options: &CookieOptions) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            options: CookieOptions {
                max_age: Some(0),
                ..options.clone()
            },
        }
    }

    pub fn is_removal(&self) -> bool {
        self.value.is_empty() || self.options.max_age == Some(0)
    }

    /// Renders the `Set-Cookie` header value.
    pub fn to_header_string(&self) -> String {
        let mut out = format!("{}={}; Path={}", self.name, self.value, self.options.path);
        if let Some(domain) = &self.options.domain {
            out.push_str(&format!("; Domain={domain}"));
        }
        if let Some(max_age) = self.options.max_age {
            out.push_str(&format!("; Max-Age={max_age}"));
        }
        if let Some(same_site) = self.options.same_site {
            out.push_str(&format!("; SameSite={}", same_site.as_str()));
        }
        if self.options.http_only {
            out.push_str("; HttpOnly");
        }
        if self.options.secure {
            out.push_str("; Secure");
        }
        out
    }
}

/// The two cookie capabilities the auth client needs. It never sees the
/// concrete request or response behind them.
pub trait CookieJar: Send {
    fn get_all(&self) -> Vec<Cookie>;
    fn set_all(&mut self, batch: Vec<CookieToSet>);
}

/// Parses every `Cookie` header on a request, in order.
pub fn request_cookies(headers: &HeaderMap) -> Vec<Cookie> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(parse_cookie_header)
        .collect()
}

pub fn parse_cookie_header(header: &str) -> Vec<Cookie> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(Cookie::new(name, value.trim().trim_matches('"')))
        })
        .collect()
}

pub fn cookie_header_string(cookies: &[Cookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Replaces the request's `Cookie` headers with a single header built from `cookies`.
pub fn write_request_cookies(headers: &mut HeaderMap, cookies: &[Cookie]) {
    headers.remove(COOKIE);
    if cookies.is_empty() {
        return;
    }
    match HeaderValue::from_str(&cookie_header_string(cookies)) {
        Ok(value) => {
            headers.insert(COOKIE, value);
        }
        Err(e) => warn!("Dropping unrepresentable cookie header: {e}"),
    }
}

/// Appends one `Set-Cookie` header per directive.
pub fn append_set_cookies(headers: &mut HeaderMap, batch: &[CookieToSet]) {
    for cookie in batch {
        match HeaderValue::from_str(&cookie.to_header_string()) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(e) => warn!(cookie = %cookie.name, "Skipping unrepresentable Set-Cookie: {e}"),
        }
    }
}

/// True for `name` itself and for its chunks `name.0`, `name.1`, ...
pub fn is_chunk_of(base: &str, candidate: &str) -> bool {
    if candidate == base {
        return true;
    }
    candidate
        .strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('.'))
        .map_or(false, |index| index.parse::<usize>().is_ok())
}

/// Reassembles a possibly chunked cookie value. The unchunked cookie wins.
pub fn combine_chunks(base: &str, cookies: &[Cookie]) -> Option<String> {
    let find = |name: &str| cookies.iter().find(|c| c.name == name).map(|c| c.value.as_str());

    if let Some(value) = find(base) {
        return Some(value.to_string());
    }

    let mut combined = String::new();
    for index in 0.. {
        match find(&format!("{base}.{index}")) {
            Some(part) => combined.push_str(part),
            None => break,
        }
    }
    (!combined.is_empty()).then_some(combined)
}

/// Splits a value into `(name, part)` pairs no longer than the chunk size.
/// Values are base64 text, so byte offsets are char boundaries.
pub fn chunk_value(base: &str, value: &str) -> Vec<(String, String)> {
    if value.len() <= SESSION_COOKIE_CHUNK_SIZE {
        return vec![(base.to_string(), value.to_string())];
    }
    value
        .as_bytes()
        .chunks(SESSION_COOKIE_CHUNK_SIZE)
        .enumerate()
        .map(|(index, part)| {
            (
                format!("{base}.{index}"),
                String::from_utf8_lossy(part).into_owned(),
            )
        })
        .collect()
}

pub fn encode_session(session: &Session) -> Result<String> {
    let json = serde_json::to_vec(session)?;
    Ok(format!("{SESSION_COOKIE_PREFIX}{}", URL_SAFE_NO_PAD.encode(json)))
}

/// Accepts both the `base64-` form and raw JSON written by older clients.
pub fn decode_session(raw: &str) -> Result<Session> {
    let json = match raw.strip_prefix(SESSION_COOKIE_PREFIX) {
        Some(encoded) => URL_SAFE_NO_PAD
            .decode(encoded.trim_end_matches('='))
            .map_err(|e| PortalError::Session(format!("invalid base64: {e}")))?,
        None => raw.as_bytes().to_vec(),
    };
    Ok(serde_json::from_slice(&json)?)
}
