//! In-process stand-in for the auth service's REST endpoints.
#![allow(dead_code)]

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use portal_kit::constants::{SUPABASE_ANON_KEY_VAR, SUPABASE_URL_VAR};
use portal_kit::session::cookies::encode_session;
use portal_kit::session::Session;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const ANON_KEY: &str = "anon-key";
pub const GOOD_REFRESH: &str = "good-refresh";
pub const FRESH_ACCESS: &str = "fresh-access";
pub const LIVE_ACCESS: &str = "live-access";
/// Refreshes fine, but the user lookup for the issued token answers 503.
pub const FLAKY_REFRESH: &str = "flaky-refresh";
pub const FLAKY_ACCESS: &str = "flaky-access";

#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn has_anon_key(headers: &HeaderMap) -> bool {
    headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(ANON_KEY)
}

async fn token(
    State(hits): State<Hits>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    hits.bump();
    let grant_ok = query.get("grant_type").map(String::as_str) == Some("refresh_token");
    let access_token = if body["refresh_token"] == GOOD_REFRESH {
        FRESH_ACCESS
    } else if body["refresh_token"] == FLAKY_REFRESH {
        FLAKY_ACCESS
    } else {
        ""
    };
    if !grant_ok || !has_anon_key(&headers) || access_token.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid Refresh Token: Refresh Token Not Found"
            })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "access_token": access_token,
            "refresh_token": "fresh-refresh",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": { "id": "user-1", "email": "ana@portal.app" }
        })),
    )
}

async fn user(State(hits): State<Hits>, headers: HeaderMap) -> impl IntoResponse {
    hits.bump();
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match bearer {
        Some(FRESH_ACCESS) | Some(LIVE_ACCESS) if has_anon_key(&headers) => (
            StatusCode::OK,
            Json(json!({ "id": "user-1", "email": "ana@portal.app", "role": "authenticated" })),
        ),
        Some(FLAKY_ACCESS) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "msg": "upstream unavailable" })),
        ),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "invalid JWT" }))),
    }
}

/// Starts the stub on an ephemeral port and returns its base URL.
pub async fn spawn_auth_service() -> (String, Hits) {
    let hits = Hits::default();
    let app = Router::new()
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/user", get(user))
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), hits)
}

pub fn source_for(url: &str) -> HashMap<String, String> {
    let mut source = HashMap::new();
    source.insert(SUPABASE_URL_VAR.to_string(), url.to_string());
    source.insert(SUPABASE_ANON_KEY_VAR.to_string(), ANON_KEY.to_string());
    source
}

pub fn session_cookie(access: &str, refresh: &str, expires_at: i64) -> String {
    let session = Session {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        expires_in: Some(3600),
        expires_at: Some(expires_at),
        token_type: "bearer".to_string(),
        user: None,
    };
    format!("sb-127-auth-token={}", encode_session(&session).unwrap())
}
