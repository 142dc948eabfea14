use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::entities::project;
use crate::errors::ServiceError;
use crate::handlers::{Actor, AppState};
use crate::services::projects::{
    ConfigurationFilter, CreateProjectInput, ProjectListQuery, ProjectSummary, UpdateProjectInput,
};
use crate::services::units::{KanbanColumn, ProjectGrid};
use crate::{ApiResponse, ApiResult};

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    #[serde(rename = "type", default)]
    pub kind: ConfigurationFilter,
}

pub fn project_routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/summaries", get(project_summaries))
        .route(
            "/projects/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/projects/:id/grid", get(project_grid))
        .route("/projects/:id/kanban", get(kanban_board))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Query(query): Query<ProjectListQuery>,
) -> ApiResult<Vec<project::Model>> {
    let projects = state.services.projects.list_projects(&identity, query).await?;
    Ok(Json(ApiResponse::success(projects)))
}

pub async fn project_summaries(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<Vec<ProjectSummary>> {
    let summaries = state
        .services
        .projects
        .project_summaries(&identity, query.kind)
        .await?;
    Ok(Json(ApiResponse::success(summaries)))
}

pub async fn create_project(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Json(payload): Json<CreateProjectInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let project = state
        .services
        .projects
        .create_project(&identity, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(project))))
}

pub async fn get_project(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Path(id): Path<i32>,
) -> ApiResult<project::Model> {
    let project = state.services.projects.get_project(&identity, id).await?;
    Ok(Json(ApiResponse::success(project)))
}

pub async fn update_project(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProjectInput>,
) -> ApiResult<project::Model> {
    let project = state
        .services
        .projects
        .update_project(&identity, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(project)))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Path(id): Path<i32>,
) -> Result<StatusCode, ServiceError> {
    state.services.projects.delete_project(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn project_grid(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Path(id): Path<i32>,
) -> ApiResult<ProjectGrid> {
    let grid = state.services.units.project_grid(&identity, id).await?;
    Ok(Json(ApiResponse::success(grid)))
}

pub async fn kanban_board(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Path(id): Path<i32>,
) -> ApiResult<Vec<KanbanColumn>> {
    let board = state.services.units.kanban_board(&identity, id).await?;
    Ok(Json(ApiResponse::success(board)))
}
