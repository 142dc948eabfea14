//! Construction inventory core
//!
//! Project → block → floor → unit inventories with per-actor access scoping,
//! idempotent unit grid generation, the unit sale/CRM lifecycle and material
//! stock reconciliation, exposed through a thin axum layer.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod repositories;
pub mod services;

use axum::{response::Json, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::events::EventSender;
use crate::repositories::PageAccessStore;
use crate::services::factory::{ServiceContainer, ServiceFactory};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Arc<EventSender>,
    pub services: ServiceContainer,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: Arc<EventSender>,
        page_access: Arc<dyn PageAccessStore>,
    ) -> Self {
        let factory = ServiceFactory::new(
            db.clone(),
            event_sender.clone(),
            page_access,
            config.capacity_limits(),
        );

        Self {
            services: ServiceContainer::new(&factory),
            db,
            config,
            event_sender,
        }
    }
}

// Common response wrappers
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(handlers::health::health_routes())
        .merge(handlers::projects::project_routes())
        .merge(handlers::blocks::block_routes())
        .merge(handlers::units::unit_routes())
        .merge(handlers::stock::stock_routes())
        .merge(handlers::dashboard::dashboard_routes())
        .merge(handlers::supervisors::supervisor_routes())
}

/// Full application router with HTTP tracing and request timeouts.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}
