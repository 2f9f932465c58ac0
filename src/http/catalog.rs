//! Category, tool, and unit handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use crib_store::{
    Category, CategoryId, NewCategory, NewTool, ToolDefinition, ToolId, ToolUnit, UnitId,
};
use serde_json::{json, Value};

use super::AppState;
use crate::{
    catalog::{ToolDetail, ToolUpdate},
    error::CribResult,
};

// ------------------------------------------------------------------
// Categories
// ------------------------------------------------------------------

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> CribResult<Json<Vec<Category>>> {
    Ok(Json(state.catalog.list_categories().await?))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewCategory>,
) -> CribResult<Json<Category>> {
    Ok(Json(state.catalog.create_category(body).await?))
}

pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<CategoryId>,
    Json(body): Json<NewCategory>,
) -> CribResult<Json<Category>> {
    Ok(Json(state.catalog.update_category(&id, body).await?))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<CategoryId>,
) -> CribResult<Json<Value>> {
    state.catalog.delete_category(&id).await?;
    Ok(Json(json!({ "deleted": id })))
}

// ------------------------------------------------------------------
// Tool definitions
// ------------------------------------------------------------------

pub async fn list_tools(
    State(state): State<Arc<AppState>>,
) -> CribResult<Json<Vec<ToolDefinition>>> {
    Ok(Json(state.catalog.list_tools().await?))
}

pub async fn create_tool(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewTool>,
) -> CribResult<Json<ToolDefinition>> {
    Ok(Json(state.catalog.create_tool(body).await?))
}

pub async fn tool_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ToolId>,
) -> CribResult<Json<ToolDetail>> {
    Ok(Json(state.catalog.tool_detail(&id).await?))
}

pub async fn update_tool(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ToolId>,
    Json(body): Json<ToolUpdate>,
) -> CribResult<Json<ToolDefinition>> {
    Ok(Json(state.catalog.update_tool(&id, body).await?))
}

pub async fn delete_tool(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ToolId>,
) -> CribResult<Json<Value>> {
    state.catalog.delete_tool(&id).await?;
    Ok(Json(json!({ "deleted": id })))
}

// ------------------------------------------------------------------
// Units
// ------------------------------------------------------------------

pub async fn list_units(State(state): State<Arc<AppState>>) -> CribResult<Json<Vec<ToolUnit>>> {
    Ok(Json(state.registry.list_all_units().await?))
}

pub async fn list_tool_units(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ToolId>,
) -> CribResult<Json<Vec<ToolUnit>>> {
    Ok(Json(state.catalog.tool_detail(&id).await?.units))
}

pub async fn mark_maintenance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<UnitId>,
) -> CribResult<Json<ToolUnit>> {
    Ok(Json(state.registry.mark_maintenance(&id).await?))
}

pub async fn clear_maintenance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<UnitId>,
) -> CribResult<Json<ToolUnit>> {
    Ok(Json(state.registry.clear_maintenance(&id).await?))
}
