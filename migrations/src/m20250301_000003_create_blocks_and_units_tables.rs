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
                    .table(ProjectBlocks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProjectBlocks::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProjectBlocks::ProjectId).integer().not_null())
                    .col(ColumnDef::new(ProjectBlocks::Name).string_len(128).not_null())
                    .col(
                        ColumnDef::new(ProjectBlocks::Sequence)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(ProjectBlocks::FloorCount).integer().not_null())
                    .col(
                        ColumnDef::new(ProjectBlocks::UnitsPerFloor)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProjectBlocks::Notes).text().null())
                    .col(ColumnDef::new(ProjectBlocks::UnitLayoutTemplate).json().null())
                    .col(
                        ColumnDef::new(ProjectBlocks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProjectBlocks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_blocks_project_id")
                            .from(ProjectBlocks::Table, ProjectBlocks::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProjectUnits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProjectUnits::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProjectUnits::BlockId).integer().not_null())
                    .col(ColumnDef::new(ProjectUnits::FloorNumber).integer().not_null())
                    .col(ColumnDef::new(ProjectUnits::UnitNumber).integer().not_null())
                    .col(ColumnDef::new(ProjectUnits::Label).string().not_null())
                    .col(
                        ColumnDef::new(ProjectUnits::BhkConfiguration)
                            .string_len(32)
                            .null(),
                    )
                    .col(ColumnDef::new(ProjectUnits::Facing).string_len(32).null())
                    .col(ColumnDef::new(ProjectUnits::AreaSqft).decimal_len(12, 2).null())
                    .col(ColumnDef::new(ProjectUnits::Price).decimal_len(14, 2).null())
                    .col(
                        ColumnDef::new(ProjectUnits::Status)
                            .string_len(20)
                            .not_null()
                            .default("available"),
                    )
                    .col(
                        ColumnDef::new(ProjectUnits::CrmStage)
                            .string_len(20)
                            .not_null()
                            .default("visitor"),
                    )
                    .col(
                        ColumnDef::new(ProjectUnits::CrmStageExplicit)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(ProjectUnits::BuyerName).string().null())
                    .col(ColumnDef::new(ProjectUnits::BuyerEmail).string().null())
                    .col(ColumnDef::new(ProjectUnits::BuyerPhone).string_len(32).null())
                    .col(ColumnDef::new(ProjectUnits::ReferenceSource).string().null())
                    .col(ColumnDef::new(ProjectUnits::ReferenceContact).string().null())
                    .col(ColumnDef::new(ProjectUnits::BookingDate).date().null())
                    .col(ColumnDef::new(ProjectUnits::Notes).text().null())
                    .col(
                        ColumnDef::new(ProjectUnits::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProjectUnits::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_units_block_id")
                            .from(ProjectUnits::Table, ProjectUnits::BlockId)
                            .to(ProjectBlocks::Table, ProjectBlocks::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProjectUnits::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProjectBlocks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ProjectBlocks {
    Table,
    Id,
    ProjectId,
    Name,
    Sequence,
    FloorCount,
    UnitsPerFloor,
    Notes,
    UnitLayoutTemplate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum ProjectUnits {
    Table,
    Id,
    BlockId,
    FloorNumber,
    UnitNumber,
    Label,
    BhkConfiguration,
    Facing,
    AreaSqft,
    Price,
    Status,
    CrmStage,
    CrmStageExplicit,
    BuyerName,
    BuyerEmail,
    BuyerPhone,
    ReferenceSource,
    ReferenceContact,
    BookingDate,
    Notes,
    CreatedAt,
    UpdatedAt,
}
