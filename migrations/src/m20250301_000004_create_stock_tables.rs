use sea_orm_migration::prelude::*;

use super::m20250301_000002_create_projects_table::Projects;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MaterialItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MaterialItems::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MaterialItems::Name)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(MaterialItems::DisplayName).string().not_null())
                    .col(
                        ColumnDef::new(MaterialItems::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(MaterialItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StockBalances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockBalances::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StockBalances::ProjectId).integer().not_null())
                    .col(
                        ColumnDef::new(StockBalances::MaterialItemId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockBalances::Allocated)
                            .decimal_len(14, 3)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(StockBalances::Used)
                            .decimal_len(14, 3)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(StockBalances::Notes).text().null())
                    .col(
                        ColumnDef::new(StockBalances::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockBalances::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_balances_project_id")
                            .from(StockBalances::Table, StockBalances::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_balances_material_item_id")
                            .from(StockBalances::Table, StockBalances::MaterialItemId)
                            .to(MaterialItems::Table, MaterialItems::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StockBalances::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MaterialItems::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum MaterialItems {
    Table,
    Id,
    Name,
    DisplayName,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum StockBalances {
    Table,
    Id,
    ProjectId,
    MaterialItemId,
    Allocated,
    Used,
    Notes,
    CreatedAt,
    UpdatedAt,
}
