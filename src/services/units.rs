use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::entities::project_unit::{CrmStage, UnitStatus};
use crate::entities::{project, project_block, project_unit};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::repositories::UnitRepository;
use crate::services::access_scope::{AccessScopeResolver, ProjectOrdering};
use crate::services::identity::Identity;
use crate::services::unit_lifecycle::{
    apply_status, effective_stage, parse_status, set_stage, stage_columns,
};

/// Partial unit update; omitted fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUnitInput {
    pub status: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub label: Option<String>,
    #[validate(length(max = 32))]
    pub bhk_configuration: Option<String>,
    #[validate(length(max = 32))]
    pub facing: Option<String>,
    pub area_sqft: Option<Decimal>,
    pub price: Option<Decimal>,
    #[validate(length(max = 255))]
    pub buyer_name: Option<String>,
    #[validate(email)]
    pub buyer_email: Option<String>,
    #[validate(length(max = 32))]
    pub buyer_phone: Option<String>,
    pub reference_source: Option<String>,
    pub reference_contact: Option<String>,
    pub booking_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Sale-status counts over a set of units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusTotals {
    pub total: u64,
    pub available: u64,
    pub hold: u64,
    pub booked: u64,
    pub sold: u64,
}

impl StatusTotals {
    pub fn record(&mut self, status: UnitStatus) {
        self.total += 1;
        match status {
            UnitStatus::Available => self.available += 1,
            UnitStatus::Hold => self.hold += 1,
            UnitStatus::Booked => self.booked += 1,
            UnitStatus::Sold => self.sold += 1,
        }
    }
}

impl FromIterator<UnitStatus> for StatusTotals {
    fn from_iter<I: IntoIterator<Item = UnitStatus>>(iter: I) -> Self {
        let mut totals = StatusTotals::default();
        for status in iter {
            totals.record(status);
        }
        totals
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KanbanCard {
    pub unit_id: i32,
    pub unit_label: String,
    pub block_name: String,
    pub buyer_name: Option<String>,
    pub status: UnitStatus,
    pub stage: CrmStage,
}

#[derive(Debug, Clone, Serialize)]
pub struct KanbanColumn {
    pub key: CrmStage,
    pub label: &'static str,
    pub hint: &'static str,
    pub cards: Vec<KanbanCard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridUnit {
    pub id: i32,
    pub unit_number: i32,
    pub label: String,
    pub status: UnitStatus,
    pub stage: CrmStage,
    pub bhk_configuration: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridFloor {
    pub floor: i32,
    pub units: Vec<GridUnit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridBlock {
    pub id: i32,
    pub name: String,
    pub sequence: i32,
    pub floor_count: i32,
    pub units_per_floor: i32,
    /// Highest floor first
    pub floors: Vec<GridFloor>,
    pub totals: StatusTotals,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectGrid {
    pub project: project::Model,
    pub blocks: Vec<GridBlock>,
    pub totals: StatusTotals,
}

/// Row of the sales CRM unit list
#[derive(Debug, Clone, Serialize)]
pub struct CrmUnit {
    pub id: i32,
    pub label: String,
    pub block_name: String,
    pub project_id: i32,
    pub project_code: String,
    pub project_name: String,
    pub status: UnitStatus,
    pub stage: CrmStage,
    pub bhk_configuration: Option<String>,
    pub facing: Option<String>,
    pub area_sqft: Option<Decimal>,
    pub price: Option<Decimal>,
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
    pub buyer_phone: Option<String>,
    pub reference_source: Option<String>,
    pub booking_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Most rows the CRM list returns
pub const CRM_UNIT_LIMIT: u64 = 300;

/// Persistence and board views around the unit state machine
#[derive(Clone)]
pub struct UnitService {
    db: Arc<DatabaseConnection>,
    scope: AccessScopeResolver,
    units: UnitRepository,
    event_sender: Arc<EventSender>,
}

impl UnitService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self {
            scope: AccessScopeResolver::new(db.clone()),
            units: UnitRepository::new(db.clone()),
            db,
            event_sender,
        }
    }

    /// Applies a partial update. Every check runs before the single write.
    #[instrument(skip(self, identity, input), fields(actor_id = identity.actor_id))]
    pub async fn update_unit(
        &self,
        identity: &Identity,
        unit_id: i32,
        input: UpdateUnitInput,
    ) -> Result<project_unit::Model, ServiceError> {
        input.validate()?;
        let next_status = input.status.as_deref().map(parse_status).transpose()?;
        for (field, value) in [("price", input.price), ("area_sqft", input.area_sqft)] {
            if value.map_or(false, |v| v < Decimal::ZERO) {
                return Err(ServiceError::InvalidInput(format!(
                    "{} must not be negative",
                    field
                )));
            }
        }

        let (_, _, unit) = self.scope.authorize_unit(identity, unit_id).await?;

        let mut updated = unit.clone();
        let change = next_status
            .map(|status| apply_status(&mut updated, status));

        if let Some(label) = input.label {
            updated.label = label.trim().to_string();
        }
        if input.bhk_configuration.is_some() {
            updated.bhk_configuration = input.bhk_configuration;
        }
        if input.facing.is_some() {
            updated.facing = input.facing;
        }
        if input.area_sqft.is_some() {
            updated.area_sqft = input.area_sqft;
        }
        if input.price.is_some() {
            updated.price = input.price;
        }
        if input.buyer_name.is_some() {
            updated.buyer_name = input.buyer_name;
        }
        if input.buyer_email.is_some() {
            updated.buyer_email = input.buyer_email;
        }
        if input.buyer_phone.is_some() {
            updated.buyer_phone = input.buyer_phone;
        }
        if input.reference_source.is_some() {
            updated.reference_source = input.reference_source;
        }
        if input.reference_contact.is_some() {
            updated.reference_contact = input.reference_contact;
        }
        if input.booking_date.is_some() {
            updated.booking_date = input.booking_date;
        }
        if input.notes.is_some() {
            updated.notes = input.notes;
        }

        let saved = self.save(unit, updated).await?;

        if let Some(change) = change.filter(|c| !c.is_noop()) {
            self.event_sender
                .send_or_log(Event::UnitStatusChanged {
                    unit_id,
                    old_status: change.from.to_string(),
                    new_status: change.to.to_string(),
                })
                .await;
        }

        info!("Unit updated: {}", unit_id);
        Ok(saved)
    }

    /// Kanban drag: pins an explicit CRM stage on the unit.
    #[instrument(skip(self, identity), fields(actor_id = identity.actor_id))]
    pub async fn update_stage(
        &self,
        identity: &Identity,
        unit_id: i32,
        raw_stage: &str,
    ) -> Result<project_unit::Model, ServiceError> {
        let (_, _, unit) = self.scope.authorize_unit(identity, unit_id).await?;

        let mut updated = unit.clone();
        let stage = set_stage(&mut updated, raw_stage)?;
        let saved = self.save(unit, updated).await?;

        self.event_sender
            .send_or_log(Event::UnitStageChanged {
                unit_id,
                stage: stage.to_string(),
            })
            .await;

        info!("Unit {} moved to stage {}", unit_id, stage);
        Ok(saved)
    }

    #[instrument(skip(self, identity), fields(actor_id = identity.actor_id))]
    pub async fn kanban_board(
        &self,
        identity: &Identity,
        project_id: i32,
    ) -> Result<Vec<KanbanColumn>, ServiceError> {
        self.scope.authorize_project(identity, project_id).await?;
        let blocks = self.blocks_of(project_id).await?;
        let block_names: BTreeMap<i32, &str> =
            blocks.iter().map(|b| (b.id, b.name.as_str())).collect();
        let block_ids: Vec<i32> = blocks.iter().map(|b| b.id).collect();
        let units = self.units.find_by_blocks(&block_ids).await?;

        let mut columns: Vec<KanbanColumn> = stage_columns()
            .into_iter()
            .map(|(key, label, hint)| KanbanColumn {
                key,
                label,
                hint,
                cards: Vec::new(),
            })
            .collect();

        for unit in units {
            let stage = effective_stage(&unit);
            let card = KanbanCard {
                unit_id: unit.id,
                block_name: block_names
                    .get(&unit.block_id)
                    .copied()
                    .unwrap_or_default()
                    .to_string(),
                unit_label: unit.label,
                buyer_name: unit.buyer_name,
                status: unit.status,
                stage,
            };
            if let Some(column) = columns.iter_mut().find(|c| c.key == stage) {
                column.cards.push(card);
            }
        }

        Ok(columns)
    }

    /// Blocks by sequence then name, floors descending, units ascending.
    #[instrument(skip(self, identity), fields(actor_id = identity.actor_id))]
    pub async fn project_grid(
        &self,
        identity: &Identity,
        project_id: i32,
    ) -> Result<ProjectGrid, ServiceError> {
        let project = self.scope.authorize_project(identity, project_id).await?;
        let blocks = self.blocks_of(project_id).await?;
        let block_ids: Vec<i32> = blocks.iter().map(|b| b.id).collect();

        let mut by_block: BTreeMap<i32, BTreeMap<i32, Vec<GridUnit>>> = BTreeMap::new();
        let mut block_totals: BTreeMap<i32, StatusTotals> = BTreeMap::new();
        let mut totals = StatusTotals::default();

        for unit in self.units.find_by_blocks(&block_ids).await? {
            totals.record(unit.status);
            block_totals.entry(unit.block_id).or_default().record(unit.status);
            let stage = effective_stage(&unit);
            by_block
                .entry(unit.block_id)
                .or_default()
                .entry(unit.floor_number)
                .or_default()
                .push(GridUnit {
                    id: unit.id,
                    unit_number: unit.unit_number,
                    label: unit.label,
                    status: unit.status,
                    stage,
                    bhk_configuration: unit.bhk_configuration,
                });
        }

        let blocks = blocks
            .into_iter()
            .map(|block| {
                let floors = by_block
                    .remove(&block.id)
                    .unwrap_or_default()
                    .into_iter()
                    .rev()
                    .map(|(floor, mut units)| {
                        units.sort_by_key(|u| u.unit_number);
                        GridFloor { floor, units }
                    })
                    .collect();
                GridBlock {
                    totals: block_totals.remove(&block.id).unwrap_or_default(),
                    id: block.id,
                    name: block.name,
                    sequence: block.sequence,
                    floor_count: block.floor_count,
                    units_per_floor: block.units_per_floor,
                    floors,
                }
            })
            .collect();

        Ok(ProjectGrid {
            project,
            blocks,
            totals,
        })
    }

    /// Units across every accessible unit-inventory project, most recently touched first.
    ///
    /// Without a status filter available units are left out. `search` matches buyer name,
    /// buyer phone, unit label or project code, ignoring case.
    #[instrument(skip(self, identity), fields(actor_id = identity.actor_id))]
    pub async fn crm_units(
        &self,
        identity: &Identity,
        status: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<CrmUnit>, ServiceError> {
        let status = status
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_status)
            .transpose()?;
        let search = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let projects: BTreeMap<i32, project::Model> = self
            .scope
            .accessible_projects(identity, ProjectOrdering::NameAsc)
            .await?
            .into_iter()
            .filter(|p| p.configuration.has_unit_inventory())
            .map(|p| (p.id, p))
            .collect();
        if projects.is_empty() {
            return Ok(Vec::new());
        }

        let blocks: BTreeMap<i32, project_block::Model> = project_block::Entity::find()
            .filter(project_block::Column::ProjectId.is_in(projects.keys().copied()))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|b| (b.id, b))
            .collect();
        if blocks.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = project_unit::Entity::find()
            .filter(project_unit::Column::BlockId.is_in(blocks.keys().copied()));
        query = match status {
            Some(status) => query.filter(project_unit::Column::Status.eq(status)),
            None => query.filter(project_unit::Column::Status.ne(UnitStatus::Available)),
        };
        if let Some(needle) = &search {
            let pattern = format!("%{}%", needle);
            let coded_blocks: Vec<i32> = blocks
                .values()
                .filter(|b| {
                    projects
                        .get(&b.project_id)
                        .is_some_and(|p| p.code.to_lowercase().contains(needle.as_str()))
                })
                .map(|b| b.id)
                .collect();

            let mut any = Condition::any();
            for column in [
                project_unit::Column::BuyerName,
                project_unit::Column::BuyerPhone,
                project_unit::Column::Label,
            ] {
                any = any.add(Expr::expr(Func::lower(Expr::col(column))).like(pattern.as_str()));
            }
            if !coded_blocks.is_empty() {
                any = any.add(project_unit::Column::BlockId.is_in(coded_blocks));
            }
            query = query.filter(any);
        }

        let units = query
            .order_by_desc(project_unit::Column::UpdatedAt)
            .order_by_desc(project_unit::Column::Id)
            .limit(CRM_UNIT_LIMIT)
            .all(&*self.db)
            .await?;

        let mut rows = Vec::with_capacity(units.len());
        for unit in units {
            let Some(block) = blocks.get(&unit.block_id) else {
                continue;
            };
            let Some(project) = projects.get(&block.project_id) else {
                continue;
            };
            rows.push(CrmUnit {
                stage: effective_stage(&unit),
                id: unit.id,
                label: unit.label,
                block_name: block.name.clone(),
                project_id: project.id,
                project_code: project.code.clone(),
                project_name: project.name.clone(),
                status: unit.status,
                bhk_configuration: unit.bhk_configuration,
                facing: unit.facing,
                area_sqft: unit.area_sqft,
                price: unit.price,
                buyer_name: unit.buyer_name,
                buyer_email: unit.buyer_email,
                buyer_phone: unit.buyer_phone,
                reference_source: unit.reference_source,
                booking_date: unit.booking_date,
                notes: unit.notes,
                updated_at: unit.updated_at,
            });
        }

        Ok(rows)
    }

    async fn blocks_of(&self, project_id: i32) -> Result<Vec<project_block::Model>, ServiceError> {
        Ok(project_block::Entity::find()
            .filter(project_block::Column::ProjectId.eq(project_id))
            .order_by_asc(project_block::Column::Sequence)
            .order_by_asc(project_block::Column::Name)
            .all(&*self.db)
            .await?)
    }

    async fn save(
        &self,
        original: project_unit::Model,
        updated: project_unit::Model,
    ) -> Result<project_unit::Model, ServiceError> {
        let mut active: project_unit::ActiveModel = original.into();
        active.label = Set(updated.label);
        active.bhk_configuration = Set(updated.bhk_configuration);
        active.facing = Set(updated.facing);
        active.area_sqft = Set(updated.area_sqft);
        active.price = Set(updated.price);
        active.status = Set(updated.status);
        active.crm_stage = Set(updated.crm_stage);
        active.crm_stage_explicit = Set(updated.crm_stage_explicit);
        active.buyer_name = Set(updated.buyer_name);
        active.buyer_email = Set(updated.buyer_email);
        active.buyer_phone = Set(updated.buyer_phone);
        active.reference_source = Set(updated.reference_source);
        active.reference_contact = Set(updated.reference_contact);
        active.booking_date = Set(updated.booking_date);
        active.notes = Set(updated.notes);
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }
}
