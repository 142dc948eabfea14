use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, patch, put},
    Router,
};
use serde::Deserialize;

use crate::entities::project_unit;
use crate::handlers::{Actor, AppState};
use crate::services::units::{CrmUnit, UpdateUnitInput};
use crate::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct StageRequest {
    pub stage: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CrmQuery {
    pub status: Option<String>,
    pub search: Option<String>,
}

pub fn unit_routes() -> Router<AppState> {
    Router::new()
        .route("/units/crm", get(crm_units))
        .route("/units/:id", patch(update_unit))
        .route("/units/:id/stage", put(update_stage))
}

pub async fn update_unit(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Path(unit_id): Path<i32>,
    Json(payload): Json<UpdateUnitInput>,
) -> ApiResult<project_unit::Model> {
    let unit = state
        .services
        .units
        .update_unit(&identity, unit_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(unit)))
}

/// Kanban drag-and-drop target
pub async fn update_stage(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Path(unit_id): Path<i32>,
    Json(payload): Json<StageRequest>,
) -> ApiResult<project_unit::Model> {
    let unit = state
        .services
        .units
        .update_stage(&identity, unit_id, &payload.stage)
        .await?;
    Ok(Json(ApiResponse::success(unit)))
}

/// Sales CRM list; available units are hidden unless asked for by status
pub async fn crm_units(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Query(query): Query<CrmQuery>,
) -> ApiResult<Vec<CrmUnit>> {
    let units = state
        .services
        .units
        .crm_units(&identity, query.status.as_deref(), query.search.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(units)))
}
