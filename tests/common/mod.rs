#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{NaiveDate, Utc};
use construction_inventory::{
    app_router,
    config::AppConfig,
    db,
    entities::{
        actor_profile, customer, material_item, project, project_block, project_expense,
        project_payment, project_unit, supervisor, ProjectConfiguration,
    },
    events::{self, EventSender},
    repositories::{InMemoryPageAccessStore, PageAccessStore},
    AppState,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

/// In-memory SQLite database with the real migrations applied.
pub async fn test_db() -> Arc<DatabaseConnection> {
    let mut cfg = test_config();
    cfg.db_max_connections = 1;
    cfg.db_min_connections = 1;

    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .expect("failed to create test database");
    db::run_migrations(&pool)
        .await
        .expect("failed to run migrations in tests");

    Arc::new(pool)
}

pub fn test_config() -> AppConfig {
    AppConfig::new(
        "sqlite::memory:".to_string(),
        "127.0.0.1".to_string(),
        18_080,
        "test".to_string(),
    )
}

pub fn event_sender() -> Arc<EventSender> {
    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(events::process_events(rx));
    Arc::new(EventSender::new(tx))
}

/// Helper harness for driving the HTTP router against a fresh database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = test_db().await;
        let page_access: Arc<dyn PageAccessStore> = Arc::new(InMemoryPageAccessStore::new());
        let state = AppState::new(db, test_config(), event_sender(), page_access);

        Self {
            router: app_router(state.clone()),
            state,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        actor_id: Option<i32>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(actor_id) = actor_id {
            builder = builder.header("x-actor-id", actor_id.to_string());
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router responds");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, value)
    }
}

pub async fn seed_profile(db: &DatabaseConnection, actor_id: i32, user_type: Option<&str>) {
    actor_profile::ActiveModel {
        actor_id: Set(actor_id),
        user_type: Set(user_type.map(str::to_string)),
        display_name: Set(Some(format!("Actor {}", actor_id))),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed profile");
}

pub async fn seed_supervisor(
    db: &DatabaseConnection,
    actor_id: Option<i32>,
    created_by: i32,
    code: &str,
) -> supervisor::Model {
    supervisor::ActiveModel {
        actor_id: Set(actor_id),
        created_by: Set(Some(created_by)),
        code: Set(code.to_string()),
        name: Set(format!("Supervisor {}", code)),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed supervisor")
}

pub async fn seed_customer(db: &DatabaseConnection, actor_id: Option<i32>, code: &str) -> customer::Model {
    customer::ActiveModel {
        actor_id: Set(actor_id),
        code: Set(code.to_string()),
        name: Set(format!("Customer {}", code)),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed customer")
}

pub struct ProjectSeed<'a> {
    pub code: &'a str,
    pub owner_id: i32,
    pub supervisor_id: Option<i32>,
    pub customer_id: Option<i32>,
    pub configuration: ProjectConfiguration,
}

impl<'a> ProjectSeed<'a> {
    pub fn owned_by(owner_id: i32, code: &'a str) -> Self {
        Self {
            code,
            owner_id,
            supervisor_id: None,
            customer_id: None,
            configuration: ProjectConfiguration::MultiFlat,
        }
    }

    pub fn supervised_by(mut self, supervisor_id: i32) -> Self {
        self.supervisor_id = Some(supervisor_id);
        self
    }

    pub fn for_customer(mut self, customer_id: i32) -> Self {
        self.customer_id = Some(customer_id);
        self
    }
}

pub async fn seed_project(db: &DatabaseConnection, seed: ProjectSeed<'_>) -> project::Model {
    project::ActiveModel {
        owner_id: Set(seed.owner_id),
        assigned_supervisor_id: Set(seed.supervisor_id),
        assigned_customer_id: Set(seed.customer_id),
        code: Set(seed.code.to_string()),
        name: Set(format!("Project {}", seed.code)),
        status: Set(Default::default()),
        configuration: Set(seed.configuration),
        block_count: Set(0),
        budget: Set(Decimal::ZERO),
        land_address: Set(None),
        duration_months: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed project")
}

pub async fn seed_block(
    db: &DatabaseConnection,
    project_id: i32,
    name: &str,
    floors: i32,
    units_per_floor: i32,
    template: Option<Value>,
) -> project_block::Model {
    project_block::ActiveModel {
        project_id: Set(project_id),
        name: Set(name.to_string()),
        sequence: Set(1),
        floor_count: Set(floors),
        units_per_floor: Set(units_per_floor),
        notes: Set(None),
        unit_layout_template: Set(template),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed block")
}

/// Units of a block ordered by floor then unit number.
pub async fn block_units(db: &DatabaseConnection, block_id: i32) -> Vec<project_unit::Model> {
    project_unit::Entity::find()
        .filter(project_unit::Column::BlockId.eq(block_id))
        .order_by_asc(project_unit::Column::FloorNumber)
        .order_by_asc(project_unit::Column::UnitNumber)
        .all(db)
        .await
        .expect("load block units")
}

pub async fn seed_material(db: &DatabaseConnection, name: &str) -> material_item::Model {
    material_item::ActiveModel {
        name: Set(name.to_string()),
        display_name: Set(name.to_uppercase()),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed material")
}

pub async fn seed_expense(db: &DatabaseConnection, project_id: i32, amount: Decimal) {
    project_expense::ActiveModel {
        project_id: Set(project_id),
        category: Set("labour".to_string()),
        amount: Set(amount),
        description: Set(None),
        spent_on: Set(NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date")),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed expense");
}

pub async fn seed_payment(db: &DatabaseConnection, project_id: i32, amount: Decimal) {
    project_payment::ActiveModel {
        project_id: Set(project_id),
        unit_id: Set(None),
        amount: Set(amount),
        method: Set(Some("bank".to_string())),
        paid_on: Set(NaiveDate::from_ymd_opt(2025, 3, 2).expect("valid date")),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed payment");
}
