use axum::{
    extract::State,
    http::{header::HOST, HeaderMap, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::get,
    Extension, Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::{ConfigSource, FirebaseConfig, ServerConfig};
use crate::environment::{hostname_from_host_header, public_env, resolve_by_hostname};
use crate::session::{session_middleware, AuthApi, CurrentUser, SessionState};

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn ConfigSource>,
    pub session: SessionState,
    pub firebase: Option<FirebaseConfig>,
}

impl AppState {
    /// The Firebase bundle is optional: a deployment without it still serves
    /// sessions, it just has nothing to hand the browser.
    pub fn new(source: Arc<dyn ConfigSource>, api: Arc<dyn AuthApi>) -> Self {
        let firebase = match FirebaseConfig::from_source(source.as_ref()) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Firebase config unavailable: {e}");
                None
            }
        };
        Self {
            session: SessionState::new(source.clone(), api),
            source,
            firebase,
        }
    }
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "portal-server",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn current_user(Extension(CurrentUser(user)): Extension<CurrentUser>) -> impl IntoResponse {
    match user {
        Some(user) => (StatusCode::OK, Json(serde_json::json!({ "user": user }))),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "unauthenticated" })),
        ),
    }
}

async fn environment(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let hostname = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(hostname_from_host_header)
        .unwrap_or_default();

    Json(serde_json::json!({
        "hostname": hostname,
        "by_hostname": resolve_by_hostname(hostname),
        "public_env": public_env(state.source.as_ref()),
    }))
}

async fn firebase_config(State(state): State<AppState>) -> impl IntoResponse {
    match state.firebase {
        Some(config) => (StatusCode::OK, Json(serde_json::to_value(config).unwrap_or_default())),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "firebase not configured" })),
        ),
    }
}

fn cors_layer(config: &ServerConfig) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin:?}: {e}");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_credentials(true),
    )
}

/// Create the HTTP router. Everything under `/api` passes through the
/// session middleware; `/health` does not.
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let api = Router::new()
        .route("/me", get(current_user))
        .route("/environment", get(environment))
        .route("/firebase-config", get(firebase_config))
        .layer(middleware::from_fn_with_state(
            state.session.clone(),
            session_middleware,
        ));

    let router = Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    match cors_layer(config) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}
