//! Outward (issue) and inward (return) handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use crib_store::{LoanId, LoanRecord, LoanStatus};
use serde::Deserialize;

use super::AppState;
use crate::{
    error::{CribError, CribResult},
    workflow::{IssueOutcome, IssueRequest, ReturnOutcome},
};

#[derive(Debug, Deserialize)]
pub struct IssueBody {
    pub issues: Vec<IssueRequest>,
}

/// Issues a batch of units. The response reports an outcome per tuple;
/// rejected tuples do not abort the rest.
pub async fn issue(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IssueBody>,
) -> CribResult<Json<Vec<IssueOutcome>>> {
    if body.issues.is_empty() {
        return Err(CribError::validation(
            "empty_batch",
            "at least one issue tuple is required",
        ));
    }
    Ok(Json(state.workflow.issue(body.issues).await))
}

#[derive(Debug, Deserialize)]
pub struct ReturnBody {
    pub loan_ids: Vec<LoanId>,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// Returns a batch of loans. Already-returned loans come back as no-op
/// outcomes rather than errors.
pub async fn process_return(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ReturnBody>,
) -> CribResult<Json<Vec<ReturnOutcome>>> {
    if body.loan_ids.is_empty() {
        return Err(CribError::validation(
            "empty_batch",
            "at least one loan id is required",
        ));
    }
    Ok(Json(
        state.workflow.return_loans(body.loan_ids, body.remarks).await,
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct LoanQuery {
    pub status: Option<LoanStatus>,
}

pub async fn list_loans(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoanQuery>,
) -> CribResult<Json<Vec<LoanRecord>>> {
    Ok(Json(state.workflow.list_loans(query.status).await?))
}
