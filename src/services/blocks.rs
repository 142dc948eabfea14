use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::config::CapacityLimits;
use crate::entities::{project, project_block, project_unit};
use crate::errors::{is_unique_violation, ServiceError};
use crate::events::{Event, EventSender};
use crate::services::access_scope::AccessScopeResolver;
use crate::services::identity::Identity;
use crate::services::inventory_generator::InventoryGenerator;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBlockInput {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    pub floor_count: i32,
    pub units_per_floor: i32,
    pub notes: Option<String>,
    pub unit_layout_template: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateBlockInput {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    pub floor_count: Option<i32>,
    pub units_per_floor: Option<i32>,
    pub notes: Option<String>,
    pub unit_layout_template: Option<Value>,
}

/// A block together with how many units the call generated for it
#[derive(Debug, Clone, Serialize)]
pub struct BlockWithUnits {
    pub block: project_block::Model,
    pub created_units: u64,
}

/// First free name in the `Block A`, `Block B`, ... sequence, starting at the
/// letter for `existing_count`. Past `Block Z` the letters repeat with a round suffix.
pub fn default_block_name(existing: &HashSet<String>, existing_count: usize) -> String {
    (existing_count..)
        .map(|idx| {
            let letter = char::from(b'A' + (idx % 26) as u8);
            match idx / 26 {
                0 => format!("Block {}", letter),
                round => format!("Block {}{}", letter, round + 1),
            }
        })
        .find(|name| !existing.contains(name))
        .unwrap_or_else(|| format!("Block {}", existing_count + 1))
}

/// Validates a declared capacity against the configured bounds.
pub fn check_capacity(
    floor_count: i32,
    units_per_floor: i32,
    limits: CapacityLimits,
) -> Result<(), ServiceError> {
    if !(1..=limits.max_floors).contains(&floor_count) {
        return Err(ServiceError::InvalidInput(format!(
            "floor_count must be between 1 and {}",
            limits.max_floors
        )));
    }
    if !(1..=limits.max_units_per_floor).contains(&units_per_floor) {
        return Err(ServiceError::InvalidInput(format!(
            "units_per_floor must be between 1 and {}",
            limits.max_units_per_floor
        )));
    }
    Ok(())
}

/// Capacity is monotonic: neither dimension may shrink.
pub fn check_growth(
    block: &project_block::Model,
    floor_count: i32,
    units_per_floor: i32,
) -> Result<(), ServiceError> {
    if floor_count < block.floor_count || units_per_floor < block.units_per_floor {
        return Err(ServiceError::InvalidInput(format!(
            "Block {} capacity cannot shrink from {}x{} to {}x{}",
            block.id, block.floor_count, block.units_per_floor, floor_count, units_per_floor
        )));
    }
    Ok(())
}

async fn refresh_block_count<C: ConnectionTrait>(
    conn: &C,
    project_id: i32,
) -> Result<i32, ServiceError> {
    let count = project_block::Entity::find()
        .filter(project_block::Column::ProjectId.eq(project_id))
        .count(conn)
        .await?;
    let count = i32::try_from(count)
        .map_err(|_| ServiceError::InternalError(format!("Block count overflow: {}", count)))?;

    project::Entity::update_many()
        .col_expr(project::Column::BlockCount, Expr::value(count))
        .col_expr(project::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(project::Column::Id.eq(project_id))
        .exec(conn)
        .await?;

    Ok(count)
}

#[derive(Clone)]
pub struct BlockService {
    db: Arc<DatabaseConnection>,
    scope: AccessScopeResolver,
    generator: InventoryGenerator,
    limits: CapacityLimits,
    event_sender: Arc<EventSender>,
}

impl BlockService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        limits: CapacityLimits,
    ) -> Self {
        Self {
            scope: AccessScopeResolver::new(db.clone()),
            generator: InventoryGenerator::new(db.clone(), event_sender.clone()),
            db,
            limits,
            event_sender,
        }
    }

    #[instrument(skip(self, identity), fields(actor_id = identity.actor_id))]
    pub async fn list_blocks(
        &self,
        identity: &Identity,
        project_id: i32,
    ) -> Result<Vec<project_block::Model>, ServiceError> {
        self.scope.authorize_project(identity, project_id).await?;
        Ok(project_block::Entity::find()
            .filter(project_block::Column::ProjectId.eq(project_id))
            .order_by_asc(project_block::Column::Sequence)
            .order_by_asc(project_block::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Creates a block and generates its unit grid.
    #[instrument(skip(self, identity, input), fields(actor_id = identity.actor_id))]
    pub async fn create_block(
        &self,
        identity: &Identity,
        project_id: i32,
        input: CreateBlockInput,
    ) -> Result<BlockWithUnits, ServiceError> {
        identity.ensure_management_access()?;
        input.validate()?;
        check_capacity(input.floor_count, input.units_per_floor, self.limits)?;
        self.scope.authorize_project(identity, project_id).await?;

        let siblings: Vec<(String, i32)> = project_block::Entity::find()
            .select_only()
            .column(project_block::Column::Name)
            .column(project_block::Column::Sequence)
            .filter(project_block::Column::ProjectId.eq(project_id))
            .into_tuple()
            .all(&*self.db)
            .await?;
        let names: HashSet<String> = siblings.iter().map(|(n, _)| n.clone()).collect();
        let next_sequence = siblings.iter().map(|(_, s)| *s).max().unwrap_or(0) + 1;

        let name = match input.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) if names.contains(name) => {
                return Err(ServiceError::Conflict(format!(
                    "Block '{}' already exists in project {}",
                    name, project_id
                )))
            }
            Some(name) => name.to_string(),
            None => default_block_name(&names, siblings.len()),
        };

        let now = Utc::now();
        let txn = self.db.begin().await?;
        let block = project_block::ActiveModel {
            project_id: Set(project_id),
            name: Set(name.clone()),
            sequence: Set(next_sequence),
            floor_count: Set(input.floor_count),
            units_per_floor: Set(input.units_per_floor),
            notes: Set(input.notes),
            unit_layout_template: Set(input.unit_layout_template),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::Conflict(format!(
                    "Block '{}' already exists in project {}",
                    name, project_id
                ))
            } else {
                ServiceError::DatabaseError(e)
            }
        })?;
        refresh_block_count(&txn, project_id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::BlockCreated {
                project_id,
                block_id: block.id,
            })
            .await;

        let created_units = self.generator.ensure_units(&block, None).await?;

        info!(
            "Block created: {} ({}) with {} units",
            block.id, block.name, created_units
        );
        Ok(BlockWithUnits {
            block,
            created_units,
        })
    }

    /// Applies a partial update. Capacity may only grow; new cells are generated.
    #[instrument(skip(self, identity, input), fields(actor_id = identity.actor_id))]
    pub async fn update_block(
        &self,
        identity: &Identity,
        block_id: i32,
        input: UpdateBlockInput,
    ) -> Result<BlockWithUnits, ServiceError> {
        input.validate()?;
        let (_, block) = self.scope.authorize_block(identity, block_id).await?;

        let floor_count = input.floor_count.unwrap_or(block.floor_count);
        let units_per_floor = input.units_per_floor.unwrap_or(block.units_per_floor);
        check_growth(&block, floor_count, units_per_floor)?;
        check_capacity(floor_count, units_per_floor, self.limits)?;

        let name = input
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty() && *n != block.name)
            .map(str::to_string);
        if let Some(name) = name.as_deref() {
            let taken = project_block::Entity::find()
                .filter(project_block::Column::ProjectId.eq(block.project_id))
                .filter(project_block::Column::Name.eq(name))
                .count(&*self.db)
                .await?;
            if taken > 0 {
                return Err(ServiceError::Conflict(format!(
                    "Block '{}' already exists in project {}",
                    name, block.project_id
                )));
            }
        }

        let project_id = block.project_id;
        let mut active: project_block::ActiveModel = block.into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if input.notes.is_some() {
            active.notes = Set(input.notes);
        }
        if input.unit_layout_template.is_some() {
            active.unit_layout_template = Set(input.unit_layout_template);
        }
        active.floor_count = Set(floor_count);
        active.units_per_floor = Set(units_per_floor);
        active.updated_at = Set(Utc::now());
        let block = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::BlockUpdated {
                project_id,
                block_id,
            })
            .await;

        let created_units = self.generator.ensure_units(&block, None).await?;

        info!("Block updated: {} ({} new units)", block_id, created_units);
        Ok(BlockWithUnits {
            block,
            created_units,
        })
    }

    /// Removes a block and its units in one transaction.
    #[instrument(skip(self, identity), fields(actor_id = identity.actor_id))]
    pub async fn delete_block(&self, identity: &Identity, block_id: i32) -> Result<(), ServiceError> {
        let (project, _) = self.scope.authorize_block(identity, block_id).await?;

        let txn = self.db.begin().await?;
        let removed = project_unit::Entity::delete_many()
            .filter(project_unit::Column::BlockId.eq(block_id))
            .exec(&txn)
            .await?
            .rows_affected;
        project_block::Entity::delete_by_id(block_id)
            .exec(&txn)
            .await?;
        refresh_block_count(&txn, project.id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::BlockDeleted {
                project_id: project.id,
                block_id,
            })
            .await;

        info!("Block deleted: {} ({} units removed)", block_id, removed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    fn block(floors: i32, units: i32) -> project_block::Model {
        project_block::Model {
            id: 7,
            project_id: 1,
            name: "Block A".into(),
            sequence: 1,
            floor_count: floors,
            units_per_floor: units,
            notes: None,
            unit_layout_template: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[rstest]
    #[case(&[], 0, "Block A")]
    #[case(&["Block A"], 1, "Block B")]
    #[case(&["Block B"], 1, "Block C")]
    #[case(&["Block A", "Block C"], 2, "Block D")]
    fn picks_default_names(#[case] existing: &[&str], #[case] count: usize, #[case] expected: &str) {
        let existing: HashSet<String> = existing.iter().map(|s| s.to_string()).collect();
        assert_eq!(default_block_name(&existing, count), expected);
    }

    #[test]
    fn wraps_past_z() {
        assert_eq!(default_block_name(&HashSet::new(), 26), "Block A2");
    }

    #[rstest]
    #[case(0, 4)]
    #[case(4, 0)]
    #[case(201, 4)]
    #[case(4, 101)]
    fn rejects_out_of_range_capacity(#[case] floors: i32, #[case] units: i32) {
        assert_matches!(
            check_capacity(floors, units, CapacityLimits::default()),
            Err(ServiceError::InvalidInput(_))
        );
    }

    #[test]
    fn accepts_capacity_within_limits() {
        assert!(check_capacity(10, 4, CapacityLimits::default()).is_ok());
    }

    #[rstest]
    #[case(4, 4, true)]
    #[case(6, 4, true)]
    #[case(4, 5, true)]
    #[case(3, 4, false)]
    #[case(6, 3, false)]
    fn capacity_only_grows(#[case] floors: i32, #[case] units: i32, #[case] ok: bool) {
        assert_eq!(check_growth(&block(4, 4), floors, units).is_ok(), ok);
    }
}
