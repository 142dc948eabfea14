//! Expands a block's capacity declaration into a uniquely keyed grid of units.
//!
//! Units are keyed by `(floor_number, unit_number)`, so re-running generation after a
//! capacity increase only adds the newly implied cells. The unique index on
//! `(block_id, floor_number, unit_number)` plus one transaction per batch keeps
//! concurrent callers from duplicating or truncating the grid.

use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{ActiveValue::Set, DatabaseConnection, TransactionTrait};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::entities::project_block;
use crate::entities::project_unit::{self, CrmStage, UnitStatus};
use crate::errors::{is_unique_violation, ServiceError};
use crate::events::{Event, EventSender};
use crate::repositories::UnitRepository;

/// Per-unit-number defaults applied on every floor of a block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitTemplateEntry {
    pub bhk: Option<String>,
    pub facing: Option<String>,
    pub area_sqft: Option<Decimal>,
}

impl UnitTemplateEntry {
    fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            bhk: text_field(object, &["bhk_configuration", "bhk"]),
            facing: text_field(object, &["facing"]),
            area_sqft: decimal_field(object, &["area_sqft", "area"]),
        }
    }
}

/// Sparse template keyed by unit number (1..=units_per_floor).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitTemplate {
    entries: BTreeMap<i32, UnitTemplateEntry>,
}

impl UnitTemplate {
    /// Lenient parse; malformed entries are skipped rather than rejected.
    ///
    /// Accepts an object keyed by unit number (`{"2": {"bhk": "2BHK"}}`), an array of
    /// objects carrying `unit_number`, or either shape encoded as a JSON string.
    pub fn parse(value: Option<&Value>) -> Self {
        let mut template = Self::default();

        match value {
            Some(Value::Object(map)) => {
                for (key, entry) in map {
                    let (Some(unit_number), Value::Object(object)) =
                        (positive_int(&Value::String(key.clone())), entry)
                    else {
                        continue;
                    };
                    template
                        .entries
                        .insert(unit_number, UnitTemplateEntry::from_object(object));
                }
            }
            Some(Value::Array(items)) => {
                for item in items {
                    let Value::Object(object) = item else {
                        continue;
                    };
                    let Some(unit_number) = object.get("unit_number").and_then(positive_int)
                    else {
                        continue;
                    };
                    template
                        .entries
                        .insert(unit_number, UnitTemplateEntry::from_object(object));
                }
            }
            Some(Value::String(raw)) => {
                if let Ok(inner) = serde_json::from_str::<Value>(raw) {
                    if !inner.is_string() {
                        return Self::parse(Some(&inner));
                    }
                }
            }
            _ => {}
        }

        template
    }

    pub fn entry(&self, unit_number: i32) -> Option<&UnitTemplateEntry> {
        self.entries.get(&unit_number)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn positive_int(value: &Value) -> Option<i32> {
    let n = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
        })?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    i32::try_from(n).ok().filter(|n| *n > 0)
}

fn text_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn decimal_field(object: &Map<String, Value>, keys: &[&str]) -> Option<Decimal> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find_map(|value| match value {
            Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
            Value::String(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        })
}

/// Deterministic unit label
pub fn unit_label(block_name: &str, floor: i32, unit_number: i32) -> String {
    format!("{}-F{}-U{}", block_name, floor, unit_number)
}

/// A unit the generator intends to insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitDraft {
    pub floor_number: i32,
    pub unit_number: i32,
    pub label: String,
    pub bhk_configuration: Option<String>,
    pub facing: Option<String>,
    pub area_sqft: Option<Decimal>,
}

impl UnitDraft {
    fn into_active_model(self, block_id: i32, now: DateTime<Utc>) -> project_unit::ActiveModel {
        project_unit::ActiveModel {
            block_id: Set(block_id),
            floor_number: Set(self.floor_number),
            unit_number: Set(self.unit_number),
            label: Set(self.label),
            bhk_configuration: Set(self.bhk_configuration),
            facing: Set(self.facing),
            area_sqft: Set(self.area_sqft),
            price: Set(None),
            status: Set(UnitStatus::Available),
            crm_stage: Set(CrmStage::Visitor),
            crm_stage_explicit: Set(false),
            buyer_name: Set(None),
            buyer_email: Set(None),
            buyer_phone: Set(None),
            reference_source: Set(None),
            reference_contact: Set(None),
            booking_date: Set(None),
            notes: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
    }
}

/// Every grid cell of `block` missing from `existing`, floor-major.
pub fn plan_missing_units(
    block: &project_block::Model,
    existing: &HashSet<(i32, i32)>,
    template: &UnitTemplate,
) -> Vec<UnitDraft> {
    let mut drafts = Vec::new();

    for floor in 1..=block.floor_count {
        for unit_number in 1..=block.units_per_floor {
            if existing.contains(&(floor, unit_number)) {
                continue;
            }

            let entry = template.entry(unit_number);
            drafts.push(UnitDraft {
                floor_number: floor,
                unit_number,
                label: unit_label(&block.name, floor, unit_number),
                bhk_configuration: entry.and_then(|e| e.bhk.clone()),
                facing: entry.and_then(|e| e.facing.clone()),
                area_sqft: entry.and_then(|e| e.area_sqft),
            });
        }
    }

    drafts
}

#[derive(Clone)]
pub struct InventoryGenerator {
    db: Arc<DatabaseConnection>,
    units: UnitRepository,
    event_sender: Arc<EventSender>,
}

impl InventoryGenerator {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self {
            units: UnitRepository::new(db.clone()),
            db,
            event_sender,
        }
    }

    /// Creates every missing unit of `block` and returns how many this call inserted.
    ///
    /// Without an explicit `template` the block's stored template is used. A unique
    /// violation means a concurrent caller won the race: the batch is rolled back and
    /// the grid is re-planned once.
    #[instrument(skip(self, block, template), fields(block_id = block.id))]
    pub async fn ensure_units(
        &self,
        block: &project_block::Model,
        template: Option<&Value>,
    ) -> Result<u64, ServiceError> {
        let template = UnitTemplate::parse(template.or(block.unit_layout_template.as_ref()));
        let existing = self.units.existing_keys(&*self.db, block.id).await?;
        let created = self.generate_from(block, &template, existing).await?;

        if created > 0 {
            counter!("construction_inventory.units.generated", created);
            self.event_sender
                .send_or_log(Event::UnitsGenerated {
                    block_id: block.id,
                    created,
                })
                .await;
            info!("Generated {} units for block {}", created, block.id);
        }

        Ok(created)
    }

    /// Inserts the cells `existing` lacks; on a unique violation re-reads the grid and
    /// retries once. A second collision counts as nothing created.
    async fn generate_from(
        &self,
        block: &project_block::Model,
        template: &UnitTemplate,
        existing: HashSet<(i32, i32)>,
    ) -> Result<u64, ServiceError> {
        match self.insert_missing(block, template, &existing).await {
            Err(ServiceError::DatabaseError(e)) if is_unique_violation(&e) => {
                warn!(
                    "Concurrent unit generation detected for block {}; re-planning",
                    block.id
                );
                counter!("construction_inventory.units.generation_conflicts", 1);

                let fresh = self.units.existing_keys(&*self.db, block.id).await?;
                match self.insert_missing(block, template, &fresh).await {
                    Err(ServiceError::DatabaseError(e)) if is_unique_violation(&e) => {
                        counter!("construction_inventory.units.generation_conflicts", 1);
                        Ok(0)
                    }
                    other => other,
                }
            }
            other => other,
        }
    }

    async fn insert_missing(
        &self,
        block: &project_block::Model,
        template: &UnitTemplate,
        existing: &HashSet<(i32, i32)>,
    ) -> Result<u64, ServiceError> {
        let drafts = plan_missing_units(block, existing, template);
        if drafts.is_empty() {
            debug!("Block {} grid already complete", block.id);
            return Ok(0);
        }

        let now = Utc::now();
        let rows: Vec<_> = drafts
            .into_iter()
            .map(|draft| draft.into_active_model(block.id, now))
            .collect();

        let txn = self.db.begin().await?;
        match self.units.insert_batch(&txn, rows).await {
            Ok(inserted) => {
                txn.commit().await?;
                Ok(inserted)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!("Rollback after failed unit batch failed: {}", rollback_err);
                }
                Err(ServiceError::DatabaseError(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use crate::entities::{project, ProjectConfiguration};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter};
    use serde_json::json;
    use tokio::sync::mpsc;

    fn block(floors: i32, units: i32) -> project_block::Model {
        project_block::Model {
            id: 1,
            project_id: 1,
            name: "Block A".to_string(),
            sequence: 1,
            floor_count: floors,
            units_per_floor: units,
            notes: None,
            unit_layout_template: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn parses_object_keyed_by_unit_number() {
        let template = UnitTemplate::parse(Some(&json!({
            "2": {"bhk": "2BHK", "facing": "East", "area": 1150.5},
            "0": {"bhk": "ignored"},
            "x": {"bhk": "ignored"},
            "3": "not an object"
        })));

        assert_eq!(template.len(), 1);
        let entry = template.entry(2).unwrap();
        assert_eq!(entry.bhk.as_deref(), Some("2BHK"));
        assert_eq!(entry.facing.as_deref(), Some("East"));
        assert_eq!(entry.area_sqft, Some(dec!(1150.5)));
    }

    #[test]
    fn parses_array_with_unit_numbers_and_aliases() {
        let template = UnitTemplate::parse(Some(&json!([
            {"unit_number": 1, "bhk_configuration": "3BHK", "area_sqft": "1400"},
            {"unit_number": "4", "bhk": "1BHK"},
            {"unit_number": -1, "bhk": "ignored"},
            {"bhk": "missing number"},
            42
        ])));

        assert_eq!(template.len(), 2);
        assert_eq!(template.entry(1).unwrap().bhk.as_deref(), Some("3BHK"));
        assert_eq!(template.entry(1).unwrap().area_sqft, Some(dec!(1400)));
        assert_eq!(template.entry(4).unwrap().bhk.as_deref(), Some("1BHK"));
    }

    #[test]
    fn parses_template_encoded_as_string() {
        let raw = json!("[{\"unit_number\": 2, \"facing\": \"North\"}]");
        let template = UnitTemplate::parse(Some(&raw));
        assert_eq!(template.entry(2).unwrap().facing.as_deref(), Some("North"));
    }

    #[test]
    fn malformed_templates_are_empty() {
        assert!(UnitTemplate::parse(None).is_empty());
        assert!(UnitTemplate::parse(Some(&json!(null))).is_empty());
        assert!(UnitTemplate::parse(Some(&json!(17))).is_empty());
        assert!(UnitTemplate::parse(Some(&json!("not json"))).is_empty());
    }

    #[test]
    fn plans_full_grid_with_template_fields() {
        let template = UnitTemplate::parse(Some(&json!({"2": {"bhk": "2BHK"}})));
        let drafts = plan_missing_units(&block(2, 3), &HashSet::new(), &template);

        assert_eq!(drafts.len(), 6);
        let labels: HashSet<_> = drafts.iter().map(|d| d.label.clone()).collect();
        assert_eq!(labels.len(), 6);
        assert!(labels.contains("Block A-F2-U3"));

        for draft in &drafts {
            let expected = (draft.unit_number == 2).then(|| "2BHK".to_string());
            assert_eq!(draft.bhk_configuration, expected);
        }
    }

    #[test]
    fn plans_only_missing_cells() {
        let existing: HashSet<_> = [(1, 1), (1, 2), (2, 1)].into_iter().collect();
        let drafts = plan_missing_units(&block(2, 2), &existing, &UnitTemplate::default());
        let cells: Vec<_> = drafts
            .iter()
            .map(|d| (d.floor_number, d.unit_number))
            .collect();
        assert_eq!(cells, vec![(2, 2)]);
    }

    #[test]
    fn zero_capacity_plans_nothing() {
        assert!(plan_missing_units(&block(0, 4), &HashSet::new(), &UnitTemplate::default())
            .is_empty());
    }

    async fn stored_block(db: &DatabaseConnection, floors: i32, units: i32) -> project_block::Model {
        let now = Utc::now();
        let project = project::ActiveModel {
            owner_id: Set(1),
            assigned_supervisor_id: Set(None),
            assigned_customer_id: Set(None),
            code: Set("P-RACE".to_string()),
            name: Set("Race".to_string()),
            status: Set(Default::default()),
            configuration: Set(ProjectConfiguration::MultiFlat),
            block_count: Set(1),
            budget: Set(Decimal::ZERO),
            land_address: Set(None),
            duration_months: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();

        project_block::ActiveModel {
            project_id: Set(project.id),
            name: Set("Block A".to_string()),
            sequence: Set(1),
            floor_count: Set(floors),
            units_per_floor: Set(units),
            notes: Set(None),
            unit_layout_template: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn stale_plan_collision_is_replanned() {
        let db = establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .unwrap();
        run_migrations(&db).await.unwrap();
        let db = Arc::new(db);
        let block = stored_block(&db, 2, 2).await;

        // Another caller already inserted (1, 1) after our snapshot was taken
        let winner = plan_missing_units(&block, &HashSet::new(), &UnitTemplate::default())
            .into_iter()
            .next()
            .unwrap();
        winner
            .into_active_model(block.id, Utc::now())
            .insert(&*db)
            .await
            .unwrap();

        let (tx, _rx) = mpsc::channel(8);
        let generator = InventoryGenerator::new(db.clone(), Arc::new(EventSender::new(tx)));
        let created = generator
            .generate_from(&block, &UnitTemplate::default(), HashSet::new())
            .await
            .unwrap();
        assert_eq!(created, 3);

        let units = project_unit::Entity::find()
            .filter(project_unit::Column::BlockId.eq(block.id))
            .all(&*db)
            .await
            .unwrap();
        let keys: HashSet<_> = units
            .iter()
            .map(|u| (u.floor_number, u.unit_number))
            .collect();
        assert_eq!(units.len(), 4);
        assert_eq!(keys.len(), 4);
    }

    proptest! {
        #[test]
        fn planned_plus_existing_covers_grid_exactly(
            floors in 0i32..12,
            units in 0i32..12,
            seed in proptest::collection::vec((1i32..14, 1i32..14), 0..40),
        ) {
            let b = block(floors, units);
            let existing: HashSet<(i32, i32)> = seed
                .into_iter()
                .filter(|(f, u)| *f <= floors && *u <= units)
                .collect();

            let drafts = plan_missing_units(&b, &existing, &UnitTemplate::default());
            let planned: HashSet<(i32, i32)> =
                drafts.iter().map(|d| (d.floor_number, d.unit_number)).collect();

            // no duplicates, no overlap with existing, union is the whole grid
            prop_assert_eq!(planned.len(), drafts.len());
            prop_assert!(planned.is_disjoint(&existing));
            prop_assert_eq!(
                (planned.len() + existing.len()) as i64,
                i64::from(floors) * i64::from(units)
            );

            // re-planning after applying the drafts is a no-op
            let mut all = existing.clone();
            all.extend(planned);
            prop_assert!(plan_missing_units(&b, &all, &UnitTemplate::default()).is_empty());
        }

        #[test]
        fn raising_floor_count_adds_exactly_the_new_rows(
            floors in 1i32..10,
            extra in 0i32..6,
            units in 1i32..10,
        ) {
            let before: HashSet<(i32, i32)> = plan_missing_units(
                &block(floors, units),
                &HashSet::new(),
                &UnitTemplate::default(),
            )
            .into_iter()
            .map(|d| (d.floor_number, d.unit_number))
            .collect();

            let added = plan_missing_units(
                &block(floors + extra, units),
                &before,
                &UnitTemplate::default(),
            );
            prop_assert_eq!(added.len() as i32, extra * units);
            prop_assert!(added.iter().all(|d| d.floor_number > floors));
        }
    }
}
