use sea_orm_migration::prelude::*;

use super::m20250301_000002_create_projects_table::Projects;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Expense and payment rows block project deletion (Restrict, never Cascade)
        manager
            .create_table(
                Table::create()
                    .table(ProjectExpenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProjectExpenses::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProjectExpenses::ProjectId).integer().not_null())
                    .col(
                        ColumnDef::new(ProjectExpenses::Category)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProjectExpenses::Amount)
                            .decimal_len(14, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProjectExpenses::Description).text().null())
                    .col(ColumnDef::new(ProjectExpenses::SpentOn).date().not_null())
                    .col(
                        ColumnDef::new(ProjectExpenses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_expenses_project_id")
                            .from(ProjectExpenses::Table, ProjectExpenses::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProjectPayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProjectPayments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProjectPayments::ProjectId).integer().not_null())
                    .col(ColumnDef::new(ProjectPayments::UnitId).integer().null())
                    .col(
                        ColumnDef::new(ProjectPayments::Amount)
                            .decimal_len(14, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProjectPayments::Method).string_len(32).null())
                    .col(ColumnDef::new(ProjectPayments::PaidOn).date().not_null())
                    .col(
                        ColumnDef::new(ProjectPayments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_payments_project_id")
                            .from(ProjectPayments::Table, ProjectPayments::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProjectPayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProjectExpenses::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ProjectExpenses {
    Table,
    Id,
    ProjectId,
    Category,
    Amount,
    Description,
    SpentOn,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum ProjectPayments {
    Table,
    Id,
    ProjectId,
    UnitId,
    Amount,
    Method,
    PaidOn,
    CreatedAt,
}
