use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sale status of a unit.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum UnitStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "hold")]
    Hold,
    #[sea_orm(string_value = "booked")]
    Booked,
    #[sea_orm(string_value = "sold")]
    Sold,
}

impl Default for UnitStatus {
    fn default() -> Self {
        UnitStatus::Available
    }
}

/// Sales-pipeline position of a unit, distinct from its sale status.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CrmStage {
    #[sea_orm(string_value = "visitor")]
    Visitor,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl Default for CrmStage {
    fn default() -> Self {
        CrmStage::Visitor
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_units")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub block_id: i32,
    pub floor_number: i32,
    pub unit_number: i32,
    pub label: String,
    #[sea_orm(nullable)]
    pub bhk_configuration: Option<String>,
    #[sea_orm(nullable)]
    pub facing: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub area_sqft: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))", nullable)]
    pub price: Option<Decimal>,
    pub status: UnitStatus,
    pub crm_stage: CrmStage,
    /// Set once an operator assigns a stage; derivation stops from then on
    pub crm_stage_explicit: bool,
    #[sea_orm(nullable)]
    pub buyer_name: Option<String>,
    #[sea_orm(nullable)]
    pub buyer_email: Option<String>,
    #[sea_orm(nullable)]
    pub buyer_phone: Option<String>,
    #[sea_orm(nullable)]
    pub reference_source: Option<String>,
    #[sea_orm(nullable)]
    pub reference_contact: Option<String>,
    #[sea_orm(nullable)]
    pub booking_date: Option<NaiveDate>,
    #[sea_orm(nullable)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project_block::Entity",
        from = "Column::BlockId",
        to = "super::project_block::Column::Id",
        on_delete = "Cascade"
    )]
    Block,
}

impl Related<super::project_block::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Block.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
