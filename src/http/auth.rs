//! Login, step-up confirmation, and the step-up audit feed.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Extension, Json,
};
use crib_auth::{Principal, StepUpAuditEntry};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Response {
    match state
        .auth
        .sessions
        .login(&state.auth.config, &body.username, &body.password)
    {
        Ok(token) => {
            info!(username = %body.username, "session opened");
            Json(LoginResponse {
                token,
                username: body.username,
            })
            .into_response()
        }
        Err(err) => crib_auth::auth_error(err),
    }
}

pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<serde_json::Value> {
    let revoked = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| state.auth.sessions.logout(token));
    Json(json!({ "revoked": revoked }))
}

#[derive(Debug, Deserialize)]
pub struct StepUpRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct StepUpResponse {
    pub step_up_token: String,
    pub expires_in_secs: u64,
}

/// Re-confirms the signed-in principal's password and hands back a
/// short-lived token for the protected routes.
pub async fn step_up(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<StepUpRequest>,
) -> Response {
    match state.auth.step_up.confirm(
        &state.auth.config,
        &principal,
        &body.password,
        &state.auth.audit,
    ) {
        Ok(step_up_token) => Json(StepUpResponse {
            step_up_token,
            expires_in_secs: state.auth.config.step_up_ttl.as_secs(),
        })
        .into_response(),
        Err(err) => crib_auth::auth_error(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    #[serde(default = "default_audit_limit")]
    pub limit: usize,
}

fn default_audit_limit() -> usize {
    100
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            limit: default_audit_limit(),
        }
    }
}

pub async fn step_up_audit(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
) -> Json<Vec<StepUpAuditEntry>> {
    Json(state.auth.audit.recent(query.limit))
}
