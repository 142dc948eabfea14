//! Resolves which projects an [`Identity`] may read or mutate.
//!
//! Every project-scoped read and write goes through [`AccessScopeResolver::authorize_project`]
//! or filters by [`ProjectScope`], so the OR-combined predicate lives in exactly one place.

use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::entities::{project, project_block, project_unit};
use crate::errors::ServiceError;
use crate::services::identity::{DeclaredRole, Identity};

/// Ordering of listed projects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectOrdering {
    #[default]
    NameAsc,
    /// Newest first
    Recent,
}

/// The project predicate for one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectScope {
    /// Matches nothing; no query is issued
    Nothing,
    Owned { owner_id: i32 },
    Supervised { supervisor_id: i32 },
    /// Owned OR supervisor-assigned OR customer-assigned
    Union {
        owner_id: i32,
        supervisor_id: Option<i32>,
        customer_id: Option<i32>,
    },
}

impl ProjectScope {
    pub fn for_identity(identity: &Identity) -> Result<Self, ServiceError> {
        identity.ensure_management_access()?;

        Ok(match identity.declared_role {
            DeclaredRole::Owner => ProjectScope::Owned {
                owner_id: identity.owner_id(),
            },
            DeclaredRole::Supervisor => match identity.supervisor_id {
                Some(supervisor_id) => ProjectScope::Supervised { supervisor_id },
                None => ProjectScope::Nothing,
            },
            DeclaredRole::Unspecified => ProjectScope::Union {
                owner_id: identity.owner_id(),
                supervisor_id: identity.supervisor_id,
                customer_id: identity.customer_id,
            },
            // ensure_management_access rejects customers above
            DeclaredRole::Customer => ProjectScope::Nothing,
        })
    }

    /// Query condition for this scope; `None` means the scope is empty.
    pub fn condition(&self) -> Option<Condition> {
        match *self {
            ProjectScope::Nothing => None,
            ProjectScope::Owned { owner_id } => {
                Some(Condition::all().add(project::Column::OwnerId.eq(owner_id)))
            }
            ProjectScope::Supervised { supervisor_id } => Some(
                Condition::all().add(project::Column::AssignedSupervisorId.eq(supervisor_id)),
            ),
            ProjectScope::Union {
                owner_id,
                supervisor_id,
                customer_id,
            } => {
                let mut any = Condition::any().add(project::Column::OwnerId.eq(owner_id));
                if let Some(supervisor_id) = supervisor_id {
                    any = any.add(project::Column::AssignedSupervisorId.eq(supervisor_id));
                }
                if let Some(customer_id) = customer_id {
                    any = any.add(project::Column::AssignedCustomerId.eq(customer_id));
                }
                Some(any)
            }
        }
    }

    /// In-memory form of [`ProjectScope::condition`].
    pub fn admits(&self, project: &project::Model) -> bool {
        match *self {
            ProjectScope::Nothing => false,
            ProjectScope::Owned { owner_id } => project.owner_id == owner_id,
            ProjectScope::Supervised { supervisor_id } => {
                project.assigned_supervisor_id == Some(supervisor_id)
            }
            ProjectScope::Union {
                owner_id,
                supervisor_id,
                customer_id,
            } => {
                project.owner_id == owner_id
                    || (supervisor_id.is_some() && project.assigned_supervisor_id == supervisor_id)
                    || (customer_id.is_some() && project.assigned_customer_id == customer_id)
            }
        }
    }
}

/// Scope predicate for an identity, `None` when nothing is accessible.
pub fn scope_condition(identity: &Identity) -> Result<Option<Condition>, ServiceError> {
    Ok(ProjectScope::for_identity(identity)?.condition())
}

#[derive(Clone)]
pub struct AccessScopeResolver {
    db: Arc<DatabaseConnection>,
}

impl AccessScopeResolver {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, identity), fields(actor_id = identity.actor_id))]
    pub async fn accessible_projects(
        &self,
        identity: &Identity,
        ordering: ProjectOrdering,
    ) -> Result<Vec<project::Model>, ServiceError> {
        let Some(condition) = scope_condition(identity)? else {
            debug!("Actor {} has no accessible projects", identity.actor_id);
            return Ok(Vec::new());
        };

        let query = project::Entity::find().filter(condition);
        let query = match ordering {
            ProjectOrdering::NameAsc => query
                .order_by_asc(project::Column::Name)
                .order_by_asc(project::Column::Id),
            ProjectOrdering::Recent => query
                .order_by_desc(project::Column::CreatedAt)
                .order_by_desc(project::Column::Id),
        };

        Ok(query.all(&*self.db).await?)
    }

    #[instrument(skip(self, identity), fields(actor_id = identity.actor_id))]
    pub async fn accessible_project_ids(
        &self,
        identity: &Identity,
    ) -> Result<BTreeSet<i32>, ServiceError> {
        let Some(condition) = scope_condition(identity)? else {
            return Ok(BTreeSet::new());
        };

        let ids: Vec<i32> = project::Entity::find()
            .select_only()
            .column(project::Column::Id)
            .filter(condition)
            .into_tuple()
            .all(&*self.db)
            .await?;

        Ok(ids.into_iter().collect())
    }

    /// Loads a project the identity may act on.
    ///
    /// `NotFound` when the project does not exist, `Forbidden` when it lies outside the scope.
    #[instrument(skip(self, identity), fields(actor_id = identity.actor_id))]
    pub async fn authorize_project(
        &self,
        identity: &Identity,
        project_id: i32,
    ) -> Result<project::Model, ServiceError> {
        let scope = ProjectScope::for_identity(identity)?;

        let project = project::Entity::find_by_id(project_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Project {} not found", project_id)))?;

        if !scope.admits(&project) {
            return Err(ServiceError::Forbidden(format!(
                "Project {} is not accessible to actor {}",
                project_id, identity.actor_id
            )));
        }

        Ok(project)
    }

    /// Loads a block and its project, checking project access.
    pub async fn authorize_block(
        &self,
        identity: &Identity,
        block_id: i32,
    ) -> Result<(project::Model, project_block::Model), ServiceError> {
        identity.ensure_management_access()?;

        let block = project_block::Entity::find_by_id(block_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Block {} not found", block_id)))?;
        let project = self.authorize_project(identity, block.project_id).await?;

        Ok((project, block))
    }

    /// Loads a unit with its block and project, checking project access.
    pub async fn authorize_unit(
        &self,
        identity: &Identity,
        unit_id: i32,
    ) -> Result<(project::Model, project_block::Model, project_unit::Model), ServiceError> {
        identity.ensure_management_access()?;

        let unit = project_unit::Entity::find_by_id(unit_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Unit {} not found", unit_id)))?;
        let (project, block) = self.authorize_block(identity, unit.block_id).await?;

        Ok((project, block, unit))
    }
}
