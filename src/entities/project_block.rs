use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A named sub-structure of a project with a declared floor/units-per-floor capacity.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_blocks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub project_id: i32,
    pub name: String,
    pub sequence: i32,
    pub floor_count: i32,
    pub units_per_floor: i32,
    #[sea_orm(nullable)]
    pub notes: Option<String>,
    /// Sparse per-unit-number defaults (BHK, facing, area)
    #[sea_orm(column_type = "Json", nullable)]
    pub unit_layout_template: Option<Json>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Number of cells in the declared grid.
    pub fn capacity(&self) -> i64 {
        i64::from(self.floor_count.max(0)) * i64::from(self.units_per_floor.max(0))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id",
        on_delete = "Cascade"
    )]
    Project,
    #[sea_orm(has_many = "super::project_unit::Entity")]
    Units,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::project_unit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Units.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
