use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a project.
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
#[strum(ascii_case_insensitive)]
pub enum ProjectStatus {
    #[sea_orm(string_value = "Planning")]
    Planning,
    #[sea_orm(string_value = "Active")]
    Active,
    #[sea_orm(string_value = "On Hold")]
    #[serde(rename = "On Hold")]
    #[strum(to_string = "On Hold", serialize = "on_hold", serialize = "OnHold")]
    OnHold,
    #[sea_orm(string_value = "Completed")]
    Completed,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::Active
    }
}

/// Flat-vs-plot tag routing unit payment and kanban views.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ProjectConfiguration {
    #[sea_orm(string_value = "standard")]
    Standard,
    #[sea_orm(string_value = "multi_flat")]
    MultiFlat,
    #[sea_orm(string_value = "multi_plot")]
    MultiPlot,
}

impl Default for ProjectConfiguration {
    fn default() -> Self {
        ProjectConfiguration::Standard
    }
}

impl ProjectConfiguration {
    /// Projects whose units are sold individually and appear on boards.
    pub fn has_unit_inventory(self) -> bool {
        matches!(
            self,
            ProjectConfiguration::MultiFlat | ProjectConfiguration::MultiPlot
        )
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub owner_id: i32,
    #[sea_orm(nullable)]
    pub assigned_supervisor_id: Option<i32>,
    #[sea_orm(nullable)]
    pub assigned_customer_id: Option<i32>,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub status: ProjectStatus,
    pub configuration: ProjectConfiguration,
    pub block_count: i32,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub budget: Decimal,
    #[sea_orm(nullable)]
    pub land_address: Option<String>,
    #[sea_orm(nullable)]
    pub duration_months: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::project_block::Entity")]
    Blocks,
    #[sea_orm(has_many = "super::stock_balance::Entity")]
    StockBalances,
    #[sea_orm(has_many = "super::project_expense::Entity")]
    Expenses,
    #[sea_orm(has_many = "super::project_payment::Entity")]
    Payments,
}

impl Related<super::project_block::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Blocks.def()
    }
}

impl Related<super::stock_balance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockBalances.def()
    }
}

impl Related<super::project_expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl Related<super::project_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
