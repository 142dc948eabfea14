use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, put},
    Router,
};

use crate::entities::stock_balance;
use crate::handlers::{Actor, AppState};
use crate::services::stock::{StockLine, StockUpdate};
use crate::{ApiResponse, ApiResult};

pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/projects/:id/stock", get(stock_overview))
        .route("/projects/:id/stock/:material_id", put(update_stock))
}

pub async fn stock_overview(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Path(project_id): Path<i32>,
) -> ApiResult<Vec<StockLine>> {
    let lines = state
        .services
        .stock
        .stock_overview(&identity, project_id)
        .await?;
    Ok(Json(ApiResponse::success(lines)))
}

/// The stored `used` may be lower than requested when it exceeded the allocation.
pub async fn update_stock(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Path((project_id, material_id)): Path<(i32, i32)>,
    Json(payload): Json<StockUpdate>,
) -> ApiResult<stock_balance::Model> {
    let balance = state
        .services
        .stock
        .apply_update(&identity, project_id, material_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(balance)))
}
