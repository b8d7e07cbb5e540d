use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::SupabaseConfig;
use crate::error::{PortalError, Result};
use crate::session::cookies::{
    chunk_value, combine_chunks, decode_session, encode_session, is_chunk_of, CookieJar,
    CookieOptions, CookieToSet,
};
use crate::session::{Session, User};

/// The two auth-service calls the session flow needs.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchanges a refresh token for a new session.
    async fn refresh_session(&self, config: &SupabaseConfig, refresh_token: &str) -> Result<Session>;

    /// Resolves the user an access token belongs to.
    async fn get_user(&self, config: &SupabaseConfig, access_token: &str) -> Result<User>;
}

/// `AuthApi` over the Supabase GoTrue REST endpoints.
#[derive(Debug, Clone, Default)]
pub struct ReqwestAuthApi {
    client: reqwest::Client,
}

impl ReqwestAuthApi {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Deserialize)]
struct AuthErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

async fn error_from_response(resp: reqwest::Response) -> PortalError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<AuthErrorBody>(&body)
        .ok()
        .and_then(|b| b.error_description.or(b.msg).or(b.message).or(b.error))
        .unwrap_or(body);
    PortalError::Auth { status, message }
}

#[async_trait]
impl AuthApi for ReqwestAuthApi {
    async fn refresh_session(&self, config: &SupabaseConfig, refresh_token: &str) -> Result<Session> {
        let resp = self
            .client
            .post(config.auth_endpoint("token"))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &config.anon_key)
            .header(AUTHORIZATION, format!("Bearer {}", config.anon_key))
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        Ok(resp.json::<Session>().await?)
    }

    async fn get_user(&self, config: &SupabaseConfig, access_token: &str) -> Result<User> {
        let resp = self
            .client
            .get(config.auth_endpoint("user"))
            .header("apikey", &config.anon_key)
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        Ok(resp.json::<User>().await?)
    }
}

/// Auth client bound to one request's cookies.
///
/// Reads the session from `cookies`, and writes rotated or cleared session
/// cookies back through the same capability while resolving the user.
pub struct AuthClient<'a, A: AuthApi + ?Sized, J: CookieJar + ?Sized> {
    config: &'a SupabaseConfig,
    api: &'a A,
    cookies: &'a mut J,
    cookie_options: CookieOptions,
}

impl<'a, A: AuthApi + ?Sized, J: CookieJar + ?Sized> AuthClient<'a, A, J> {
    pub fn new(config: &'a SupabaseConfig, api: &'a A, cookies: &'a mut J) -> Self {
        Self {
            config,
            api,
            cookies,
            cookie_options: CookieOptions::default(),
        }
    }

    pub fn with_cookie_options(mut self, options: CookieOptions) -> Self {
        self.cookie_options = options;
        self
    }

    /// Current session, refreshed first if the access token is about to expire.
    pub async fn get_session(&mut self) -> Result<Option<Session>> {
        let name = self.config.auth_cookie_name();
        let Some(raw) = combine_chunks(&name, &self.cookies.get_all()) else {
            return Ok(None);
        };

        let session = match decode_session(&raw) {
            Ok(session) => session,
            Err(e) => {
                warn!("Discarding unreadable session cookie: {e}");
                self.write_session(None)?;
                return Ok(None);
            }
        };

        let now = Utc::now().timestamp();
        if !session.is_expired(now) {
            return Ok(Some(session));
        }

        debug!("Access token expired, refreshing session");
        match self
            .api
            .refresh_session(self.config, &session.refresh_token)
            .await
        {
            Ok(refreshed) => {
                let refreshed = refreshed.with_expiry_from(now);
                self.write_session(Some(&refreshed))?;
                info!("Session refreshed");
                Ok(Some(refreshed))
            }
            Err(e) if e.is_auth_rejection() => {
                warn!("Refresh token rejected, clearing session: {e}");
                self.write_session(None)?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// The user behind the session, or `None` when there is no valid session.
    pub async fn get_user(&mut self) -> Result<Option<User>> {
        let Some(session) = self.get_session().await? else {
            return Ok(None);
        };

        match self.api.get_user(self.config, &session.access_token).await {
            Ok(user) => Ok(Some(user)),
            Err(PortalError::Auth { status: 401 | 403, message }) => {
                debug!("Access token rejected: {message}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Writes `session` as (possibly chunked) cookies, or clears it when `None`.
    /// Chunks left over from a previous, longer value are removed.
    fn write_session(&mut self, session: Option<&Session>) -> Result<()> {
        let name = self.config.auth_cookie_name();

        let fresh = match session {
            Some(session) => chunk_value(&name, &encode_session(session)?),
            None => Vec::new(),
        };

        let mut batch: Vec<CookieToSet> = self
            .cookies
            .get_all()
            .into_iter()
            .filter(|c| is_chunk_of(&name, &c.name))
            .filter(|c| !fresh.iter().any(|(n, _)| *n == c.name))
            .map(|c| CookieToSet::removal(c.name, &self.cookie_options))
            .collect();

        batch.extend(
            fresh
                .into_iter()
                .map(|(n, v)| CookieToSet::new(n, v, self.cookie_options.clone())),
        );

        if !batch.is_empty() {
            self.cookies.set_all(batch);
        }
        Ok(())
    }
}
