//! Axum middleware for session and step-up enforcement.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    audit::StepUpAudit,
    config::AuthConfig,
    error::AuthError,
    session::{Principal, SessionManager},
    step_up::StepUpManager,
};

/// Header carrying the step-up token on mutating requests.
pub const HEADER_STEP_UP: &str = "x-crib-step-up";
/// Header echoing the machine-readable error code on auth failures.
pub const HEADER_ERROR_CODE: &str = "x-crib-error-code";

/// Shared state for the auth middleware stack.
#[derive(Debug)]
pub struct AuthState {
    pub config: AuthConfig,
    pub sessions: SessionManager,
    pub step_up: StepUpManager,
    pub audit: StepUpAudit,
}

impl AuthState {
    pub fn new(config: AuthConfig) -> Self {
        let sessions = SessionManager::new(config.session_ttl);
        let step_up = StepUpManager::new(config.step_up_ttl);
        let audit = StepUpAudit::with_capacity(config.audit_capacity);
        Self {
            config,
            sessions,
            step_up,
            audit,
        }
    }
}

/// Extension trait for pulling the authenticated principal off a request.
pub trait PrincipalExt {
    fn principal(&self) -> Option<&Principal>;
}

impl PrincipalExt for Request {
    fn principal(&self) -> Option<&Principal> {
        self.extensions().get::<Principal>()
    }
}

/// Requires a valid `Authorization: Bearer <token>` session and attaches the
/// resolved [`Principal`] to request extensions.
pub async fn session_middleware(
    State(state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Some(token) => token,
        None => return auth_error(AuthError::SessionRequired),
    };
    match state.sessions.validate(&token) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(err) => auth_error(err),
    }
}

/// Requires a live step-up token in [`HEADER_STEP_UP`] bound to the session
/// principal. Must run inside `session_middleware`.
pub async fn step_up_middleware(
    State(state): State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(principal) = request.principal().cloned() else {
        return auth_error(AuthError::SessionRequired);
    };
    let Some(token) = request
        .headers()
        .get(HEADER_STEP_UP)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
    else {
        return auth_error(AuthError::StepUpRequired);
    };
    let action = request.uri().path().to_string();
    state.step_up.sweep();
    match state
        .step_up
        .check(&token, &principal, &action, &state.audit)
    {
        Ok(()) => next.run(request).await,
        Err(err) => auth_error(err),
    }
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}

/// Maps an [`AuthError`] to its HTTP response.
pub fn auth_error(err: AuthError) -> Response {
    let status = match err {
        AuthError::BadCredentials
        | AuthError::SessionRequired
        | AuthError::SessionInvalid => StatusCode::UNAUTHORIZED,
        AuthError::StepUpRequired | AuthError::StepUpInvalid => StatusCode::FORBIDDEN,
    };
    let code = err.code();
    let mut response = (
        status,
        Json(json!({
            "error": {
                "type": status.canonical_reason().unwrap_or("Unknown Status Code"),
                "code": code,
                "message": err.to_string(),
            }
        })),
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(code) {
        response.headers_mut().insert(HEADER_ERROR_CODE, value);
    }
    response
}
