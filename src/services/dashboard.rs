use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

use crate::entities::project::ProjectStatus;
use crate::entities::{project_expense, project_payment};
use crate::errors::ServiceError;
use crate::services::access_scope::{AccessScopeResolver, ProjectOrdering};
use crate::services::identity::Identity;

/// Dashboard card order and copy
pub const STATUS_CARDS: [(ProjectStatus, &str, &str); 5] = [
    (
        ProjectStatus::Planning,
        "planning",
        "Blueprints, permits, and budgets being finalized.",
    ),
    (
        ProjectStatus::Active,
        "active",
        "Execution in progress with live site activity.",
    ),
    (
        ProjectStatus::OnHold,
        "on_hold",
        "Paused for approvals, funds, or client decisions.",
    ),
    (
        ProjectStatus::Completed,
        "completed",
        "Delivered with handover and closing checks done.",
    ),
    (
        ProjectStatus::Cancelled,
        "cancelled",
        "Stopped with no further work planned.",
    ),
];

#[derive(Debug, Clone, Serialize)]
pub struct StatusCard {
    pub key: &'static str,
    pub status: ProjectStatus,
    pub label: String,
    pub description: &'static str,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardOverview {
    pub status_cards: Vec<StatusCard>,
    pub total_projects: u64,
    pub payments_total: Decimal,
    pub expenses_total: Decimal,
}

pub fn build_status_cards(statuses: impl IntoIterator<Item = ProjectStatus>) -> Vec<StatusCard> {
    let mut counts: BTreeMap<&'static str, u64> = BTreeMap::new();
    for status in statuses {
        if let Some((_, key, _)) = STATUS_CARDS.iter().find(|(s, _, _)| *s == status) {
            *counts.entry(*key).or_default() += 1;
        }
    }

    STATUS_CARDS
        .iter()
        .map(|(status, key, description)| StatusCard {
            key: *key,
            status: *status,
            label: status.to_string(),
            description: *description,
            count: counts.get(key).copied().unwrap_or(0),
        })
        .collect()
}

#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DatabaseConnection>,
    scope: AccessScopeResolver,
}

impl DashboardService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            scope: AccessScopeResolver::new(db.clone()),
            db,
        }
    }

    #[instrument(skip(self, identity), fields(actor_id = identity.actor_id))]
    pub async fn overview(&self, identity: &Identity) -> Result<DashboardOverview, ServiceError> {
        identity.ensure_management_access()?;
        let projects = self
            .scope
            .accessible_projects(identity, ProjectOrdering::NameAsc)
            .await?;
        let project_ids: Vec<i32> = projects.iter().map(|p| p.id).collect();

        let payments: Vec<Decimal> = project_payment::Entity::find()
            .select_only()
            .column(project_payment::Column::Amount)
            .filter(project_payment::Column::ProjectId.is_in(project_ids.clone()))
            .into_tuple()
            .all(&*self.db)
            .await?;
        let expenses: Vec<Decimal> = project_expense::Entity::find()
            .select_only()
            .column(project_expense::Column::Amount)
            .filter(project_expense::Column::ProjectId.is_in(project_ids))
            .into_tuple()
            .all(&*self.db)
            .await?;

        Ok(DashboardOverview {
            total_projects: projects.len() as u64,
            status_cards: build_status_cards(projects.iter().map(|p| p.status)),
            payments_total: payments.into_iter().sum(),
            expenses_total: expenses.into_iter().sum(),
        })
    }

    /// Payments of one project, or of every accessible project when `project_id` is `None`.
    #[instrument(skip(self, identity), fields(actor_id = identity.actor_id))]
    pub async fn list_payments(
        &self,
        identity: &Identity,
        project_id: Option<i32>,
    ) -> Result<Vec<project_payment::Model>, ServiceError> {
        identity.ensure_management_access()?;
        let project_ids: Vec<i32> = match project_id {
            Some(id) => vec![self.scope.authorize_project(identity, id).await?.id],
            None => self
                .scope
                .accessible_project_ids(identity)
                .await?
                .into_iter()
                .collect(),
        };
        if project_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(project_payment::Entity::find()
            .filter(project_payment::Column::ProjectId.is_in(project_ids))
            .order_by_desc(project_payment::Column::PaidOn)
            .order_by_desc(project_payment::Column::Id)
            .all(&*self.db)
            .await?)
    }
}
