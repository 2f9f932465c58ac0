//! Employee handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use crib_store::{Employee, EmployeeId, NewEmployee};
use serde_json::{json, Value};

use super::AppState;
use crate::error::CribResult;

pub async fn list_employees(State(state): State<Arc<AppState>>) -> CribResult<Json<Vec<Employee>>> {
    Ok(Json(state.catalog.list_employees().await?))
}

pub async fn create_employee(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewEmployee>,
) -> CribResult<Json<Employee>> {
    Ok(Json(state.catalog.create_employee(body).await?))
}

pub async fn update_employee(
    State(state): State<Arc<AppState>>,
    Path(id): Path<EmployeeId>,
    Json(body): Json<NewEmployee>,
) -> CribResult<Json<Employee>> {
    Ok(Json(state.catalog.update_employee(&id, body).await?))
}

pub async fn delete_employee(
    State(state): State<Arc<AppState>>,
    Path(id): Path<EmployeeId>,
) -> CribResult<Json<Value>> {
    state.catalog.delete_employee(&id).await?;
    Ok(Json(json!({ "deleted": id })))
}
