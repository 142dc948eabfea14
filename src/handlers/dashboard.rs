use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::entities::project_payment;
use crate::handlers::{Actor, AppState};
use crate::services::dashboard::DashboardOverview;
use crate::{ApiResponse, ApiResult};

#[derive(Debug, Default, Deserialize)]
pub struct PaymentsQuery {
    pub project_id: Option<i32>,
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(overview))
        .route("/payments", get(list_payments))
}

pub async fn overview(
    State(state): State<AppState>,
    Actor(identity): Actor,
) -> ApiResult<DashboardOverview> {
    let overview = state.services.dashboard.overview(&identity).await?;
    Ok(Json(ApiResponse::success(overview)))
}

pub async fn list_payments(
    State(state): State<AppState>,
    Actor(identity): Actor,
    Query(query): Query<PaymentsQuery>,
) -> ApiResult<Vec<project_payment::Model>> {
    let payments = state
        .services
        .dashboard
        .list_payments(&identity, query.project_id)
        .await?;
    Ok(Json(ApiResponse::success(payments)))
}
