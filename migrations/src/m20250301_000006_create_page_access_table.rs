use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_actor_tables::Supervisors;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SupervisorPageAccess::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SupervisorPageAccess::SupervisorId)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SupervisorPageAccess::Access).json().not_null())
                    .col(
                        ColumnDef::new(SupervisorPageAccess::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_supervisor_page_access_supervisor_id")
                            .from(SupervisorPageAccess::Table, SupervisorPageAccess::SupervisorId)
                            .to(Supervisors::Table, Supervisors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SupervisorPageAccess::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum SupervisorPageAccess {
    Table,
    SupervisorId,
    Access,
    UpdatedAt,
}
