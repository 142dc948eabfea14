use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, put},
    Router,
};
use serde::Deserialize;

use crate::errors::ServiceError;
use crate::handlers::{Actor, AppState};
use crate::repositories::PageAccess;
use crate::services::supervisors::{
    CreateSupervisorInput, SupervisorView, UpdateSupervisorInput,
};
use crate::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct AssignmentRequest {
    #[serde(default)]
    pub project_ids: Vec<i32>,
}

pub fn supervisor_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/supervisors",
            get(list_supervisors).post(create_supervisor),
        )
        .route(
            "/supervisors/:id",
            put(update_supervisor).delete(delete_supervisor),
        )
        .route("/supervisors/:id/projects", put(assign_projects))
        .route(
            "/supervisors/:id/page-access",
            get(get_page_access).put(set_page_access),
        )
}

pub async fn list_supervisors(
    State(state): State<AppState>,
    Actor(identity): Actor,
) -> ApiResult<Vec<SupervisorView>> {
    let supervisors = state.services.supervisors.list_supervisors(&identity).await?;
    Ok(Json(ApiResponse::success(supervisors)))
}

pub async fn create_supervisor(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Json(payload): Json<CreateSupervisorInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state
        .services
        .supervisors
        .create_supervisor(&identity, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn update_supervisor(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateSupervisorInput>,
) -> ApiResult<SupervisorView> {
    let updated = state
        .services
        .supervisors
        .update_supervisor(&identity, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

pub async fn delete_supervisor(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Path(id): Path<i32>,
) -> Result<StatusCode, ServiceError> {
    state
        .services
        .supervisors
        .delete_supervisor(&identity, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_projects(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Path(id): Path<i32>,
    Json(payload): Json<AssignmentRequest>,
) -> ApiResult<Vec<i32>> {
    let assigned = state
        .services
        .supervisors
        .assign_projects(&identity, id, payload.project_ids)
        .await?;
    Ok(Json(ApiResponse::success(assigned)))
}

pub async fn get_page_access(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Path(id): Path<i32>,
) -> ApiResult<PageAccess> {
    let access = state.services.supervisors.page_access(&identity, id).await?;
    Ok(Json(ApiResponse::success(access)))
}

pub async fn set_page_access(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Path(id): Path<i32>,
    Json(payload): Json<PageAccess>,
) -> ApiResult<PageAccess> {
    let access = state
        .services
        .supervisors
        .set_page_access(&identity, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(access)))
}
