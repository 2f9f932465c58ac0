//! HTTP mapping for [`CribError`].

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use crib_auth::HEADER_ERROR_CODE;
use crib_store::StoreError;
use serde_json::json;

use crate::error::CribError;

impl IntoResponse for CribError {
    fn into_response(self) -> Response {
        let err = match self {
            CribError::Auth(err) => return crib_auth::auth_error(err),
            other => other,
        };

        let status = match &err {
            CribError::Validation { .. } => StatusCode::BAD_REQUEST,
            CribError::NotFound { .. } | CribError::Store(StoreError::NotFound { .. }) => {
                StatusCode::NOT_FOUND
            }
            CribError::UnitUnavailable { .. }
            | CribError::UnitConflict { .. }
            | CribError::LoanAlreadyReturned(_)
            | CribError::Store(StoreError::StatusConflict { .. })
            | CribError::Store(StoreError::VersionConflict { .. }) => StatusCode::CONFLICT,
            CribError::Auth(_) => unreachable!("handled above"),
            CribError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
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
}
