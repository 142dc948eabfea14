use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "supervisors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Login identity linked to this record, if the supervisor can sign in
    #[sea_orm(nullable)]
    pub actor_id: Option<i32>,
    /// Owner actor that registered the supervisor
    #[sea_orm(nullable)]
    pub created_by: Option<i32>,
    pub code: String,
    pub name: String,
    #[sea_orm(nullable)]
    pub primary_phone: Option<String>,
    #[sea_orm(nullable)]
    pub email: Option<String>,
    #[sea_orm(nullable)]
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::supervisor_page_access::Entity")]
    PageAccess,
}

impl Related<super::supervisor_page_access::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PageAccess.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
