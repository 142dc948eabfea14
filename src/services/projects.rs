use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::entities::project::{ProjectConfiguration, ProjectStatus};
use crate::entities::{
    customer, project, project_block, project_expense, project_payment, project_unit,
    stock_balance, supervisor,
};
use crate::errors::{is_unique_violation, ServiceError};
use crate::events::{Event, EventSender};
use crate::repositories::UnitRepository;
use crate::services::access_scope::{AccessScopeResolver, ProjectOrdering};
use crate::services::identity::Identity;
use crate::services::stock::StockService;
use crate::services::units::StatusTotals;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectListQuery {
    #[serde(default)]
    pub ordering: ProjectOrdering,
    pub configuration: Option<ProjectConfiguration>,
}

/// Which unit-inventory projects a summary covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationFilter {
    #[default]
    Flat,
    Plot,
    All,
}

impl ConfigurationFilter {
    pub fn matches(self, configuration: ProjectConfiguration) -> bool {
        match self {
            ConfigurationFilter::Flat => configuration == ProjectConfiguration::MultiFlat,
            ConfigurationFilter::Plot => configuration == ProjectConfiguration::MultiPlot,
            ConfigurationFilter::All => configuration.has_unit_inventory(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub status: ProjectStatus,
    pub configuration: ProjectConfiguration,
    pub budget: Decimal,
    pub block_count: i32,
    #[serde(flatten)]
    pub units: StatusTotals,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProjectInput {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub status: Option<String>,
    #[serde(default)]
    pub configuration: ProjectConfiguration,
    pub budget: Option<Decimal>,
    pub land_address: Option<String>,
    #[validate(range(min = 1, max = 600))]
    pub duration_months: Option<i32>,
    pub assigned_supervisor_id: Option<i32>,
    pub assigned_customer_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProjectInput {
    #[validate(length(min = 1, max = 64))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub status: Option<String>,
    pub configuration: Option<ProjectConfiguration>,
    pub budget: Option<Decimal>,
    pub land_address: Option<String>,
    #[validate(range(min = 1, max = 600))]
    pub duration_months: Option<i32>,
    pub assigned_supervisor_id: Option<i32>,
    pub assigned_customer_id: Option<i32>,
}

pub fn parse_project_status(raw: &str) -> Result<ProjectStatus, ServiceError> {
    raw.trim()
        .parse()
        .map_err(|_| ServiceError::InvalidInput(format!("Unknown project status '{}'", raw)))
}

fn check_budget(budget: Option<Decimal>) -> Result<(), ServiceError> {
    match budget {
        Some(b) if b < Decimal::ZERO => Err(ServiceError::InvalidInput(
            "budget must not be negative".to_string(),
        )),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct ProjectService {
    db: Arc<DatabaseConnection>,
    scope: AccessScopeResolver,
    units: UnitRepository,
    stock: StockService,
    event_sender: Arc<EventSender>,
}

impl ProjectService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self {
            scope: AccessScopeResolver::new(db.clone()),
            units: UnitRepository::new(db.clone()),
            stock: StockService::new(db.clone(), event_sender.clone()),
            db,
            event_sender,
        }
    }

    #[instrument(skip(self, identity), fields(actor_id = identity.actor_id))]
    pub async fn list_projects(
        &self,
        identity: &Identity,
        query: ProjectListQuery,
    ) -> Result<Vec<project::Model>, ServiceError> {
        let projects = self
            .scope
            .accessible_projects(identity, query.ordering)
            .await?;

        Ok(match query.configuration {
            Some(configuration) => projects
                .into_iter()
                .filter(|p| p.configuration == configuration)
                .collect(),
            None => projects,
        })
    }

    #[instrument(skip(self, identity), fields(actor_id = identity.actor_id))]
    pub async fn get_project(
        &self,
        identity: &Identity,
        project_id: i32,
    ) -> Result<project::Model, ServiceError> {
        self.scope.authorize_project(identity, project_id).await
    }

    /// Unit counts per accessible multi-flat / multi-plot project.
    #[instrument(skip(self, identity), fields(actor_id = identity.actor_id))]
    pub async fn project_summaries(
        &self,
        identity: &Identity,
        filter: ConfigurationFilter,
    ) -> Result<Vec<ProjectSummary>, ServiceError> {
        let projects: Vec<project::Model> = self
            .scope
            .accessible_projects(identity, ProjectOrdering::NameAsc)
            .await?
            .into_iter()
            .filter(|p| filter.matches(p.configuration))
            .collect();
        if projects.is_empty() {
            return Ok(Vec::new());
        }

        let project_ids: Vec<i32> = projects.iter().map(|p| p.id).collect();
        let block_to_project: BTreeMap<i32, i32> = project_block::Entity::find()
            .select_only()
            .column(project_block::Column::Id)
            .column(project_block::Column::ProjectId)
            .filter(project_block::Column::ProjectId.is_in(project_ids))
            .into_tuple::<(i32, i32)>()
            .all(&*self.db)
            .await?
            .into_iter()
            .collect();

        let block_ids: Vec<i32> = block_to_project.keys().copied().collect();
        let mut totals: BTreeMap<i32, StatusTotals> = BTreeMap::new();
        for unit in self.units.find_by_blocks(&block_ids).await? {
            if let Some(project_id) = block_to_project.get(&unit.block_id) {
                totals.entry(*project_id).or_default().record(unit.status);
            }
        }

        Ok(projects
            .into_iter()
            .map(|p| ProjectSummary {
                units: totals.remove(&p.id).unwrap_or_default(),
                id: p.id,
                code: p.code,
                name: p.name,
                status: p.status,
                configuration: p.configuration,
                budget: p.budget,
                block_count: p.block_count,
            })
            .collect())
    }

    #[instrument(skip(self, identity, input), fields(actor_id = identity.actor_id))]
    pub async fn create_project(
        &self,
        identity: &Identity,
        input: CreateProjectInput,
    ) -> Result<project::Model, ServiceError> {
        identity.ensure_management_access()?;
        input.validate()?;
        check_budget(input.budget)?;
        let status = input
            .status
            .as_deref()
            .map(parse_project_status)
            .transpose()?
            .unwrap_or_default();
        let code = input.code.trim().to_string();

        self.ensure_code_free(&code, None).await?;
        self.ensure_assignees_exist(input.assigned_supervisor_id, input.assigned_customer_id)
            .await?;

        let now = Utc::now();
        let model = project::ActiveModel {
            owner_id: Set(identity.owner_id()),
            assigned_supervisor_id: Set(input.assigned_supervisor_id),
            assigned_customer_id: Set(input.assigned_customer_id),
            code: Set(code.clone()),
            name: Set(input.name.trim().to_string()),
            status: Set(status),
            configuration: Set(input.configuration),
            block_count: Set(0),
            budget: Set(input.budget.unwrap_or(Decimal::ZERO)),
            land_address: Set(input.land_address),
            duration_months: Set(input.duration_months),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let created = model.insert(&*self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::Conflict(format!("Project code '{}' already exists", code))
            } else {
                ServiceError::DatabaseError(e)
            }
        })?;

        self.stock.ensure_default_materials().await?;
        self.event_sender
            .send_or_log(Event::ProjectCreated(created.id))
            .await;

        info!("Project created: {} ({})", created.id, created.code);
        Ok(created)
    }

    #[instrument(skip(self, identity, input), fields(actor_id = identity.actor_id))]
    pub async fn update_project(
        &self,
        identity: &Identity,
        project_id: i32,
        input: UpdateProjectInput,
    ) -> Result<project::Model, ServiceError> {
        identity.ensure_management_access()?;
        input.validate()?;
        check_budget(input.budget)?;
        let status = input
            .status
            .as_deref()
            .map(parse_project_status)
            .transpose()?;

        let project = self.scope.authorize_project(identity, project_id).await?;

        let code = input.code.map(|c| c.trim().to_string());
        if let Some(code) = code.as_deref().filter(|c| *c != project.code) {
            self.ensure_code_free(code, Some(project_id)).await?;
        }
        self.ensure_assignees_exist(input.assigned_supervisor_id, input.assigned_customer_id)
            .await?;

        let mut active: project::ActiveModel = project.into();
        if let Some(code) = code.clone() {
            active.code = Set(code);
        }
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(status) = status {
            active.status = Set(status);
        }
        if let Some(configuration) = input.configuration {
            active.configuration = Set(configuration);
        }
        if let Some(budget) = input.budget {
            active.budget = Set(budget);
        }
        if input.land_address.is_some() {
            active.land_address = Set(input.land_address);
        }
        if input.duration_months.is_some() {
            active.duration_months = Set(input.duration_months);
        }
        if input.assigned_supervisor_id.is_some() {
            active.assigned_supervisor_id = Set(input.assigned_supervisor_id);
        }
        if input.assigned_customer_id.is_some() {
            active.assigned_customer_id = Set(input.assigned_customer_id);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::Conflict(format!(
                    "Project code '{}' already exists",
                    code.unwrap_or_default()
                ))
            } else {
                ServiceError::DatabaseError(e)
            }
        })?;

        self.event_sender
            .send_or_log(Event::ProjectUpdated(project_id))
            .await;

        info!("Project updated: {}", project_id);
        Ok(updated)
    }

    /// Deletes a project with its blocks, units and stock rows.
    ///
    /// Refused with `ReferentialGuard` while any expense or payment references it.
    #[instrument(skip(self, identity), fields(actor_id = identity.actor_id))]
    pub async fn delete_project(
        &self,
        identity: &Identity,
        project_id: i32,
    ) -> Result<(), ServiceError> {
        identity.ensure_management_access()?;
        let project = self.scope.authorize_project(identity, project_id).await?;
        if project.owner_id != identity.owner_id() {
            return Err(ServiceError::Forbidden(format!(
                "Only the owner may delete project {}",
                project_id
            )));
        }

        let expenses = project_expense::Entity::find()
            .filter(project_expense::Column::ProjectId.eq(project_id))
            .count(&*self.db)
            .await?;
        if expenses > 0 {
            return Err(ServiceError::ReferentialGuard(format!(
                "Project {} has {} expense records",
                project_id, expenses
            )));
        }

        let payments = project_payment::Entity::find()
            .filter(project_payment::Column::ProjectId.eq(project_id))
            .count(&*self.db)
            .await?;
        if payments > 0 {
            return Err(ServiceError::ReferentialGuard(format!(
                "Project {} has {} payment records",
                project_id, payments
            )));
        }

        let txn = self.db.begin().await?;
        let block_ids: Vec<i32> = project_block::Entity::find()
            .select_only()
            .column(project_block::Column::Id)
            .filter(project_block::Column::ProjectId.eq(project_id))
            .into_tuple()
            .all(&txn)
            .await?;

        let removed_units = project_unit::Entity::delete_many()
            .filter(project_unit::Column::BlockId.is_in(block_ids))
            .exec(&txn)
            .await?
            .rows_affected;
        project_block::Entity::delete_many()
            .filter(project_block::Column::ProjectId.eq(project_id))
            .exec(&txn)
            .await?;
        stock_balance::Entity::delete_many()
            .filter(stock_balance::Column::ProjectId.eq(project_id))
            .exec(&txn)
            .await?;
        project::Entity::delete_by_id(project_id).exec(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ProjectDeleted(project_id))
            .await;

        info!(
            "Project deleted: {} ({} units removed)",
            project_id, removed_units
        );
        Ok(())
    }

    async fn ensure_code_free(&self, code: &str, except: Option<i32>) -> Result<(), ServiceError> {
        let mut query = project::Entity::find().filter(project::Column::Code.eq(code));
        if let Some(id) = except {
            query = query.filter(project::Column::Id.ne(id));
        }
        if query.count(&*self.db).await? > 0 {
            warn!("Rejected duplicate project code {}", code);
            return Err(ServiceError::Conflict(format!(
                "Project code '{}' already exists",
                code
            )));
        }
        Ok(())
    }

    async fn ensure_assignees_exist(
        &self,
        supervisor_id: Option<i32>,
        customer_id: Option<i32>,
    ) -> Result<(), ServiceError> {
        if let Some(id) = supervisor_id {
            supervisor::Entity::find_by_id(id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Supervisor {} not found", id)))?;
        }
        if let Some(id) = customer_id {
            customer::Entity::find_by_id(id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", id)))?;
        }
        Ok(())
    }
}
