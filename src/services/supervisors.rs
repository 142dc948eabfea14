use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::entities::{project, supervisor};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::repositories::{PageAccess, PageAccessStore};
use crate::services::identity::{DeclaredRole, Identity};

const CODE_PREFIX: &str = "SUP-";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSupervisorInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 32))]
    pub primary_phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    /// Login identity to link, when the supervisor signs in
    pub actor_id: Option<i32>,
    #[serde(default)]
    pub project_ids: Vec<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateSupervisorInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 32))]
    pub primary_phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    pub project_ids: Option<Vec<i32>>,
    pub page_access: Option<PageAccess>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupervisorView {
    #[serde(flatten)]
    pub supervisor: supervisor::Model,
    pub assigned_project_ids: Vec<i32>,
    pub page_access: PageAccess,
}

/// Next code in the `SUP-0001` sequence after the highest existing one.
pub fn next_supervisor_code<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let last = existing
        .into_iter()
        .filter_map(|code| code.strip_prefix(CODE_PREFIX))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{:04}", CODE_PREFIX, last + 1)
}

#[derive(Clone)]
pub struct SupervisorService {
    db: Arc<DatabaseConnection>,
    page_access: Arc<dyn PageAccessStore>,
    event_sender: Arc<EventSender>,
}

impl SupervisorService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        page_access: Arc<dyn PageAccessStore>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            page_access,
            event_sender,
        }
    }

    #[instrument(skip(self, identity), fields(actor_id = identity.actor_id))]
    pub async fn list_supervisors(
        &self,
        identity: &Identity,
    ) -> Result<Vec<SupervisorView>, ServiceError> {
        ensure_owner(identity)?;
        let supervisors = supervisor::Entity::find()
            .filter(supervisor::Column::CreatedBy.eq(identity.owner_id()))
            .order_by_asc(supervisor::Column::Code)
            .all(&*self.db)
            .await?;

        let mut views = Vec::with_capacity(supervisors.len());
        for supervisor in supervisors {
            views.push(self.view(identity, supervisor).await?);
        }
        Ok(views)
    }

    #[instrument(skip(self, identity, input), fields(actor_id = identity.actor_id))]
    pub async fn create_supervisor(
        &self,
        identity: &Identity,
        input: CreateSupervisorInput,
    ) -> Result<SupervisorView, ServiceError> {
        ensure_owner(identity)?;
        input.validate()?;
        self.ensure_owned_projects(identity, &input.project_ids)
            .await?;

        let codes: Vec<String> = supervisor::Entity::find()
            .select_only()
            .column(supervisor::Column::Code)
            .filter(supervisor::Column::Code.starts_with(CODE_PREFIX))
            .into_tuple()
            .all(&*self.db)
            .await?;
        let code = next_supervisor_code(codes.iter().map(String::as_str));

        let now = Utc::now();
        let txn = self.db.begin().await?;
        let created = supervisor::ActiveModel {
            actor_id: Set(input.actor_id),
            created_by: Set(Some(identity.owner_id())),
            code: Set(code),
            name: Set(input.name.trim().to_string()),
            primary_phone: Set(input.primary_phone),
            email: Set(input.email),
            address: Set(input.address),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        if !input.project_ids.is_empty() {
            replace_assignments(&txn, identity.owner_id(), created.id, &input.project_ids).await?;
        }
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::SupervisorCreated(created.id))
            .await;

        info!("Supervisor created: {} ({})", created.id, created.code);
        self.view(identity, created).await
    }

    #[instrument(skip(self, identity, input), fields(actor_id = identity.actor_id))]
    pub async fn update_supervisor(
        &self,
        identity: &Identity,
        supervisor_id: i32,
        input: UpdateSupervisorInput,
    ) -> Result<SupervisorView, ServiceError> {
        input.validate()?;
        let existing = self.owned_supervisor(identity, supervisor_id).await?;
        if let Some(project_ids) = &input.project_ids {
            self.ensure_owned_projects(identity, project_ids).await?;
        }
        let page_access = input.page_access.map(PageAccess::normalized);
        if let Some(access) = &page_access {
            let keys: Vec<i32> = access.projects.keys().copied().collect();
            self.ensure_owned_projects(identity, &keys).await?;
        }

        let mut active: supervisor::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if input.primary_phone.is_some() {
            active.primary_phone = Set(input.primary_phone);
        }
        if input.email.is_some() {
            active.email = Set(input.email);
        }
        if input.address.is_some() {
            active.address = Set(input.address);
        }
        active.updated_at = Set(Utc::now());

        let txn = self.db.begin().await?;
        let updated = active.update(&txn).await?;
        if let Some(project_ids) = &input.project_ids {
            replace_assignments(&txn, identity.owner_id(), supervisor_id, project_ids).await?;
        }
        txn.commit().await?;

        if let Some(access) = page_access {
            self.page_access.put(supervisor_id, access).await?;
        }
        if input.project_ids.is_some() {
            let assigned = self.assigned_project_ids(identity, supervisor_id).await?;
            self.event_sender
                .send_or_log(Event::SupervisorAssignmentsChanged {
                    supervisor_id,
                    project_ids: assigned,
                })
                .await;
        }

        info!("Supervisor updated: {}", supervisor_id);
        self.view(identity, updated).await
    }

    /// Makes `project_ids` the supervisor's assignments among the actor's own projects.
    ///
    /// Projects previously assigned to the supervisor but absent from the list are unassigned.
    #[instrument(skip(self, identity), fields(actor_id = identity.actor_id))]
    pub async fn assign_projects(
        &self,
        identity: &Identity,
        supervisor_id: i32,
        project_ids: Vec<i32>,
    ) -> Result<Vec<i32>, ServiceError> {
        self.owned_supervisor(identity, supervisor_id).await?;
        self.ensure_owned_projects(identity, &project_ids).await?;

        let txn = self.db.begin().await?;
        replace_assignments(&txn, identity.owner_id(), supervisor_id, &project_ids).await?;
        txn.commit().await?;

        let assigned = self.assigned_project_ids(identity, supervisor_id).await?;
        self.event_sender
            .send_or_log(Event::SupervisorAssignmentsChanged {
                supervisor_id,
                project_ids: assigned.clone(),
            })
            .await;

        info!(
            "Supervisor {} assigned to {} projects",
            supervisor_id,
            assigned.len()
        );
        Ok(assigned)
    }

    /// Unassigns the supervisor's projects and drops its page-access entry.
    #[instrument(skip(self, identity), fields(actor_id = identity.actor_id))]
    pub async fn delete_supervisor(
        &self,
        identity: &Identity,
        supervisor_id: i32,
    ) -> Result<(), ServiceError> {
        self.owned_supervisor(identity, supervisor_id).await?;

        let txn = self.db.begin().await?;
        project::Entity::update_many()
            .col_expr(
                project::Column::AssignedSupervisorId,
                Expr::value(Option::<i32>::None),
            )
            .filter(project::Column::AssignedSupervisorId.eq(supervisor_id))
            .exec(&txn)
            .await?;
        supervisor::Entity::delete_by_id(supervisor_id)
            .exec(&txn)
            .await?;
        txn.commit().await?;
        self.page_access.remove(supervisor_id).await?;

        self.event_sender
            .send_or_log(Event::SupervisorDeleted(supervisor_id))
            .await;

        info!("Supervisor deleted: {}", supervisor_id);
        Ok(())
    }

    pub async fn page_access(
        &self,
        identity: &Identity,
        supervisor_id: i32,
    ) -> Result<PageAccess, ServiceError> {
        self.owned_supervisor(identity, supervisor_id).await?;
        Ok(self
            .page_access
            .get(supervisor_id)
            .await?
            .unwrap_or_default())
    }

    #[instrument(skip(self, identity, access), fields(actor_id = identity.actor_id))]
    pub async fn set_page_access(
        &self,
        identity: &Identity,
        supervisor_id: i32,
        access: PageAccess,
    ) -> Result<PageAccess, ServiceError> {
        self.owned_supervisor(identity, supervisor_id).await?;
        let access = access.normalized();
        let project_ids: Vec<i32> = access.projects.keys().copied().collect();
        self.ensure_owned_projects(identity, &project_ids).await?;

        self.page_access.put(supervisor_id, access.clone()).await?;
        Ok(access)
    }

    async fn owned_supervisor(
        &self,
        identity: &Identity,
        supervisor_id: i32,
    ) -> Result<supervisor::Model, ServiceError> {
        ensure_owner(identity)?;
        supervisor::Entity::find_by_id(supervisor_id)
            .filter(supervisor::Column::CreatedBy.eq(identity.owner_id()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Supervisor {} not found", supervisor_id)))
    }

    async fn ensure_owned_projects(
        &self,
        identity: &Identity,
        project_ids: &[i32],
    ) -> Result<(), ServiceError> {
        let wanted: BTreeSet<i32> = project_ids.iter().copied().collect();
        if wanted.is_empty() {
            return Ok(());
        }

        let owned: BTreeSet<i32> = project::Entity::find()
            .select_only()
            .column(project::Column::Id)
            .filter(project::Column::Id.is_in(wanted.iter().copied()))
            .filter(project::Column::OwnerId.eq(identity.owner_id()))
            .into_tuple::<i32>()
            .all(&*self.db)
            .await?
            .into_iter()
            .collect();

        match wanted.difference(&owned).next() {
            Some(id) => Err(ServiceError::Forbidden(format!(
                "Project {} is not owned by actor {}",
                id, identity.actor_id
            ))),
            None => Ok(()),
        }
    }

    async fn assigned_project_ids(
        &self,
        identity: &Identity,
        supervisor_id: i32,
    ) -> Result<Vec<i32>, ServiceError> {
        Ok(project::Entity::find()
            .select_only()
            .column(project::Column::Id)
            .filter(project::Column::AssignedSupervisorId.eq(supervisor_id))
            .filter(project::Column::OwnerId.eq(identity.owner_id()))
            .order_by_asc(project::Column::Id)
            .into_tuple()
            .all(&*self.db)
            .await?)
    }

    async fn view(
        &self,
        identity: &Identity,
        supervisor: supervisor::Model,
    ) -> Result<SupervisorView, ServiceError> {
        Ok(SupervisorView {
            assigned_project_ids: self.assigned_project_ids(identity, supervisor.id).await?,
            page_access: self.page_access.get(supervisor.id).await?.unwrap_or_default(),
            supervisor,
        })
    }
}

/// Supervisor management belongs to project owners; supervisors and customers are refused.
fn ensure_owner(identity: &Identity) -> Result<(), ServiceError> {
    match identity.declared_role {
        DeclaredRole::Supervisor | DeclaredRole::Customer => Err(ServiceError::Forbidden(format!(
            "Actor {} cannot manage supervisors",
            identity.actor_id
        ))),
        DeclaredRole::Owner | DeclaredRole::Unspecified => Ok(()),
    }
}

async fn replace_assignments<C: ConnectionTrait>(
    conn: &C,
    owner_id: i32,
    supervisor_id: i32,
    project_ids: &[i32],
) -> Result<(), ServiceError> {
    project::Entity::update_many()
        .col_expr(
            project::Column::AssignedSupervisorId,
            Expr::value(Option::<i32>::None),
        )
        .filter(project::Column::OwnerId.eq(owner_id))
        .filter(project::Column::AssignedSupervisorId.eq(supervisor_id))
        .filter(project::Column::Id.is_not_in(project_ids.iter().copied()))
        .exec(conn)
        .await?;

    if !project_ids.is_empty() {
        project::Entity::update_many()
            .col_expr(
                project::Column::AssignedSupervisorId,
                Expr::value(supervisor_id),
            )
            .col_expr(project::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(project::Column::OwnerId.eq(owner_id))
            .filter(project::Column::Id.is_in(project_ids.iter().copied()))
            .exec(conn)
            .await?;
    }

    Ok(())
}
