//! Per-(project, material) stock balances with the `used <= allocated` invariant.
//!
//! Over-use is corrected in place rather than rejected: the stored `used` is clamped
//! to `allocated` and callers see the clamp by comparing requested and returned values.

use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::entities::{material_item, stock_balance};
use crate::errors::{is_unique_violation, ServiceError};
use crate::events::{Event, EventSender};
use crate::services::access_scope::AccessScopeResolver;
use crate::services::identity::Identity;

/// Catalogue seeded into an empty material table
pub const DEFAULT_MATERIALS: [(&str, &str); 4] = [
    ("brick", "Bricks"),
    ("cement", "Cement"),
    ("steel", "Steel"),
    ("sand", "Sand"),
];

/// Result of enforcing the balance invariant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub allocated: Decimal,
    pub used: Decimal,
    pub clamped: bool,
}

/// Clamps `used` down to `allocated`.
pub fn reconcile(allocated: Decimal, used: Decimal) -> Reconciled {
    if used > allocated {
        Reconciled {
            allocated,
            used: allocated,
            clamped: true,
        }
    } else {
        Reconciled {
            allocated,
            used,
            clamped: false,
        }
    }
}

pub fn remaining(allocated: Decimal, used: Decimal) -> Decimal {
    (allocated - used).max(Decimal::ZERO)
}

/// Partial stock update; omitted fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct StockUpdate {
    pub allocated: Option<Decimal>,
    pub used: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Read-side projection of one catalogue material for a project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockLine {
    pub material_item_id: i32,
    pub name: String,
    pub display_name: String,
    pub allocated: Decimal,
    pub used: Decimal,
    pub remaining: Decimal,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct StockService {
    db: Arc<DatabaseConnection>,
    scope: AccessScopeResolver,
    event_sender: Arc<EventSender>,
}

impl StockService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self {
            scope: AccessScopeResolver::new(db.clone()),
            db,
            event_sender,
        }
    }

    /// Applies the provided fields, then clamps `used` to `allocated`. Returns the stored balance.
    #[instrument(skip(self, identity, update), fields(actor_id = identity.actor_id))]
    pub async fn apply_update(
        &self,
        identity: &Identity,
        project_id: i32,
        material_item_id: i32,
        update: StockUpdate,
    ) -> Result<stock_balance::Model, ServiceError> {
        update.validate()?;
        for (field, value) in [("allocated", update.allocated), ("used", update.used)] {
            if value.map_or(false, |v| v < Decimal::ZERO) {
                return Err(ServiceError::InvalidInput(format!(
                    "{} must not be negative",
                    field
                )));
            }
        }

        identity.ensure_management_access()?;
        self.scope.authorize_project(identity, project_id).await?;
        material_item::Entity::find_by_id(material_item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Material {} not found", material_item_id))
            })?;

        let saved = match self.write_balance(project_id, material_item_id, &update).await {
            Err(ServiceError::DatabaseError(e)) if is_unique_violation(&e) => {
                // A concurrent first write created the row; apply on top of it
                self.write_balance(project_id, material_item_id, &update)
                    .await?
            }
            other => other?,
        };

        info!(
            "Stock updated: project={} material={} allocated={} used={}",
            project_id, material_item_id, saved.allocated, saved.used
        );
        Ok(saved)
    }

    async fn write_balance(
        &self,
        project_id: i32,
        material_item_id: i32,
        update: &StockUpdate,
    ) -> Result<stock_balance::Model, ServiceError> {
        let existing = stock_balance::Entity::find()
            .filter(stock_balance::Column::ProjectId.eq(project_id))
            .filter(stock_balance::Column::MaterialItemId.eq(material_item_id))
            .one(&*self.db)
            .await?;

        let (current_allocated, current_used) = existing
            .as_ref()
            .map(|b| (b.allocated, b.used))
            .unwrap_or((Decimal::ZERO, Decimal::ZERO));

        let requested_used = update.used.unwrap_or(current_used);
        let balance = reconcile(update.allocated.unwrap_or(current_allocated), requested_used);
        if balance.clamped {
            warn!(
                project_id,
                material_item_id,
                requested_used = %requested_used,
                allocated = %balance.allocated,
                "Stock usage exceeds allocation; clamping"
            );
            counter!("construction_inventory.stock.clamped", 1);
        }

        let now = Utc::now();
        let saved = match existing {
            Some(row) => {
                let mut active: stock_balance::ActiveModel = row.into();
                active.allocated = Set(balance.allocated);
                active.used = Set(balance.used);
                if let Some(notes) = update.notes.clone() {
                    active.notes = Set(Some(notes));
                }
                active.updated_at = Set(now);
                active.update(&*self.db).await?
            }
            None => {
                stock_balance::ActiveModel {
                    project_id: Set(project_id),
                    material_item_id: Set(material_item_id),
                    allocated: Set(balance.allocated),
                    used: Set(balance.used),
                    notes: Set(update.notes.clone()),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&*self.db)
                .await?
            }
        };

        self.event_sender
            .send_or_log(Event::StockUpdated {
                project_id,
                material_item_id,
                allocated: saved.allocated,
                used: saved.used,
                clamped: balance.clamped,
            })
            .await;

        Ok(saved)
    }

    /// Active catalogue merged with the project's balances; materials without a row read as zero.
    #[instrument(skip(self, identity), fields(actor_id = identity.actor_id))]
    pub async fn stock_overview(
        &self,
        identity: &Identity,
        project_id: i32,
    ) -> Result<Vec<StockLine>, ServiceError> {
        self.scope.authorize_project(identity, project_id).await?;

        let materials = material_item::Entity::find()
            .order_by_asc(material_item::Column::Id)
            .all(&*self.db)
            .await?;
        let mut balances: HashMap<i32, stock_balance::Model> = stock_balance::Entity::find()
            .filter(stock_balance::Column::ProjectId.eq(project_id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|b| (b.material_item_id, b))
            .collect();

        let lines = materials
            .into_iter()
            .filter_map(|material| {
                let balance = balances.remove(&material.id);
                if !material.is_active && balance.is_none() {
                    return None;
                }
                let (allocated, used, notes) = balance
                    .map(|b| (b.allocated, b.used, b.notes))
                    .unwrap_or((Decimal::ZERO, Decimal::ZERO, None));
                Some(StockLine {
                    material_item_id: material.id,
                    name: material.name,
                    display_name: material.display_name,
                    allocated,
                    used,
                    remaining: remaining(allocated, used),
                    notes,
                })
            })
            .collect();

        Ok(lines)
    }

    /// Seeds the default catalogue when no materials exist. Returns rows inserted.
    #[instrument(skip(self))]
    pub async fn ensure_default_materials(&self) -> Result<u64, ServiceError> {
        if material_item::Entity::find().count(&*self.db).await? > 0 {
            return Ok(0);
        }

        let now = Utc::now();
        let rows = DEFAULT_MATERIALS.iter().map(|(name, display)| material_item::ActiveModel {
            name: Set(name.to_string()),
            display_name: Set(display.to_string()),
            is_active: Set(true),
            created_at: Set(now),
            ..Default::default()
        });

        let inserted = material_item::Entity::insert_many(rows)
            .on_conflict(
                OnConflict::column(material_item::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;

        if inserted > 0 {
            info!("Seeded {} default materials", inserted);
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn clamps_used_to_allocated() {
        let r = reconcile(dec!(100), dec!(150));
        assert_eq!(r.used, dec!(100));
        assert!(r.clamped);
        assert_eq!(remaining(r.allocated, r.used), Decimal::ZERO);
    }

    #[test]
    fn leaves_valid_balances_alone() {
        let r = reconcile(dec!(100), dec!(40));
        assert_eq!(r.used, dec!(40));
        assert!(!r.clamped);
        assert_eq!(remaining(r.allocated, r.used), dec!(60));
    }

    #[test]
    fn remaining_never_negative() {
        assert_eq!(remaining(dec!(10), dec!(25)), Decimal::ZERO);
    }

    #[test]
    fn default_catalogue_is_brick_cement_steel_sand() {
        let names: Vec<_> = DEFAULT_MATERIALS.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, ["brick", "cement", "steel", "sand"]);
    }
}
