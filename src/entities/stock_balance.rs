use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Allocated/used quantities for one (project, material) pair. `used <= allocated` after every write.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_balances")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub project_id: i32,
    pub material_item_id: i32,
    #[sea_orm(column_type = "Decimal(Some((14, 3)))")]
    pub allocated: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 3)))")]
    pub used: Decimal,
    #[sea_orm(nullable)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
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
    #[sea_orm(
        belongs_to = "super::material_item::Entity",
        from = "Column::MaterialItemId",
        to = "super::material_item::Column::Id"
    )]
    MaterialItem,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::material_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MaterialItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
