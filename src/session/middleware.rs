use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::{error, warn};

use crate::config::ConfigSource;
use crate::session::client::AuthApi;
use crate::session::{refresh_session, SessionRefresh, User};

/// Shared, read-only inputs of the session middleware.
#[derive(Clone)]
pub struct SessionState {
    pub source: Arc<dyn ConfigSource>,
    pub api: Arc<dyn AuthApi>,
}

impl SessionState {
    pub fn new(source: Arc<dyn ConfigSource>, api: Arc<dyn AuthApi>) -> Self {
        Self { source, api }
    }
}

/// Identity resolved for the current request; `None` when unauthenticated.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<User>);

/// Refreshes the session before the request reaches the handler and
/// attaches the rotated cookies to whatever the handler returns.
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn session_middleware(
    State(state): State<SessionState>,
    mut request: Request,
    next: Next,
) -> Response {
    let outcome = refresh_session(state.source.as_ref(), state.api.as_ref(), request.headers()).await;

    let SessionRefresh {
        response: session_response,
        user,
    } = match outcome {
        Ok(refresh) => refresh,
        // Only configuration can fail before the auth service is consulted
        Err(e) => {
            error!("Session middleware is not configured: {e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "server misconfigured").into_response();
        }
    };

    // Rotated cookies go out even when the identity could not be resolved
    let user = user.unwrap_or_else(|e| {
        warn!("Session refresh failed, continuing unauthenticated: {e}");
        None
    });

    session_response.forward_request_cookies(request.headers_mut());
    request.extensions_mut().insert(CurrentUser(user));

    let mut response = next.run(request).await;
    session_response.apply_to(response.headers_mut());
    response
}
