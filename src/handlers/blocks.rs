use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, put},
    Router,
};

use crate::entities::project_block;
use crate::errors::ServiceError;
use crate::handlers::{Actor, AppState};
use crate::services::blocks::{BlockWithUnits, CreateBlockInput, UpdateBlockInput};
use crate::{ApiResponse, ApiResult};

pub fn block_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/:id/blocks",
            get(list_blocks).post(create_block),
        )
        .route("/blocks/:id", put(update_block).delete(delete_block))
}

pub async fn list_blocks(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Path(project_id): Path<i32>,
) -> ApiResult<Vec<project_block::Model>> {
    let blocks = state
        .services
        .blocks
        .list_blocks(&identity, project_id)
        .await?;
    Ok(Json(ApiResponse::success(blocks)))
}

pub async fn create_block(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Path(project_id): Path<i32>,
    Json(payload): Json<CreateBlockInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state
        .services
        .blocks
        .create_block(&identity, project_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn update_block(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Path(block_id): Path<i32>,
    Json(payload): Json<UpdateBlockInput>,
) -> ApiResult<BlockWithUnits> {
    let updated = state
        .services
        .blocks
        .update_block(&identity, block_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

pub async fn delete_block(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Path(block_id): Path<i32>,
) -> Result<StatusCode, ServiceError> {
    state.services.blocks.delete_block(&identity, block_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
