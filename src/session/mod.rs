//! Session refresh: reads the auth cookies on an inbound request, lets the
//! auth service rotate them if needed, and collects the `Set-Cookie`
//! directives the outbound response must carry.

pub mod client;
pub mod cookies;
pub mod middleware;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigSource, SupabaseConfig};
use crate::constants::SESSION_EXPIRY_MARGIN_SECS;
use crate::error::Result;

pub use client::{AuthApi, AuthClient, ReqwestAuthApi};
pub use cookies::{Cookie, CookieJar, CookieOptions, CookieToSet, SameSite};
pub use middleware::{session_middleware, CurrentUser, SessionState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(default)]
    pub app_metadata: serde_json::Value,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Token bundle as issued by the auth service and stored in the session cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl Session {
    /// A session without an expiry is taken at face value; the user call
    /// will reject it if the token is stale.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at
            .map_or(false, |at| at <= now + SESSION_EXPIRY_MARGIN_SECS)
    }

    /// Fills in `expires_at` from `expires_in` when the service only sent the latter.
    pub fn with_expiry_from(mut self, now: i64) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = self.expires_in.map(|secs| now.saturating_add(secs));
        }
        self
    }
}

/// The outbound side of a refresh: the inbound request headers (forwarded
/// downstream, with rotated cookies folded in) plus the cookie batch that
/// must be sent back to the browser.
#[derive(Debug, Clone, Default)]
pub struct SessionResponse {
    request_headers: HeaderMap,
    cookies: Vec<CookieToSet>,
}

impl SessionResponse {
    pub fn from_request_headers(headers: &HeaderMap) -> Self {
        Self {
            request_headers: headers.clone(),
            cookies: Vec::new(),
        }
    }

    pub fn request_headers(&self) -> &HeaderMap {
        &self.request_headers
    }

    pub fn cookies(&self) -> &[CookieToSet] {
        &self.cookies
    }

    /// Later directives for the same name replace earlier ones.
    pub fn set_cookie(&mut self, cookie: CookieToSet) {
        self.cookies.retain(|c| c.name != cookie.name);
        self.cookies.push(cookie);
    }

    /// Copies the (possibly rotated) `Cookie` header onto the request that
    /// continues down the stack.
    pub fn forward_request_cookies(&self, headers: &mut HeaderMap) {
        let cookies = cookies::request_cookies(&self.request_headers);
        cookies::write_request_cookies(headers, &cookies);
    }

    pub fn apply_to(&self, headers: &mut HeaderMap) {
        cookies::append_set_cookies(headers, &self.cookies);
    }
}

/// Cookie capability backed by an inbound request and the response being built.
pub struct ResponseCookieJar<'a> {
    request: Vec<Cookie>,
    response: &'a mut SessionResponse,
}

impl<'a> ResponseCookieJar<'a> {
    pub fn new(response: &'a mut SessionResponse) -> Self {
        Self {
            request: cookies::request_cookies(response.request_headers()),
            response,
        }
    }
}

impl CookieJar for ResponseCookieJar<'_> {
    fn get_all(&self) -> Vec<Cookie> {
        self.request.clone()
    }

    fn set_all(&mut self, batch: Vec<CookieToSet>) {
        for cookie in batch {
            self.request.retain(|c| c.name != cookie.name);
            if !cookie.is_removal() {
                self.request.push(Cookie::new(&cookie.name, &cookie.value));
            }
            self.response.set_cookie(cookie);
        }
        cookies::write_request_cookies(&mut self.response.request_headers, &self.request);
    }
}

/// Outcome of a refresh once configuration is known to be good.
///
/// `response` is always present: cookies rotated before a later auth call
/// failed must still reach the browser, since the old refresh token is spent.
#[derive(Debug)]
pub struct SessionRefresh {
    pub response: SessionResponse,
    pub user: Result<Option<User>>,
}

/// Validates (and if needed rotates) the session carried by `request_headers`.
///
/// Configuration is read first and a missing value is the only early error;
/// it fails before the auth service is contacted. Errors from the auth
/// service are returned as-is in `SessionRefresh::user`.
pub async fn refresh_session<S, A>(
    source: &S,
    api: &A,
    request_headers: &HeaderMap,
) -> Result<SessionRefresh>
where
    S: ConfigSource + ?Sized,
    A: AuthApi + ?Sized,
{
    let config = SupabaseConfig::from_source(source)?;

    let mut response = SessionResponse::from_request_headers(request_headers);
    let user = {
        let mut jar = ResponseCookieJar::new(&mut response);
        let mut client = AuthClient::new(&config, api, &mut jar);
        client.get_user().await
    };

    Ok(SessionRefresh { response, user })
}
