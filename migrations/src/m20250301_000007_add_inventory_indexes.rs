use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_actor_tables::{Customers, Supervisors};
use super::m20250301_000002_create_projects_table::Projects;
use super::m20250301_000003_create_blocks_and_units_tables::{ProjectBlocks, ProjectUnits};
use super::m20250301_000004_create_stock_tables::StockBalances;
use super::m20250301_000005_create_finance_tables::{ProjectExpenses, ProjectPayments};

/// Uniqueness guarantees the inventory generator and stock reconciler rely on,
/// plus lookup indexes for the access-scope predicate.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One unit per grid position
        manager
            .create_index(
                Index::create()
                    .name("idx_project_units_grid_position")
                    .table(ProjectUnits::Table)
                    .col(ProjectUnits::BlockId)
                    .col(ProjectUnits::FloorNumber)
                    .col(ProjectUnits::UnitNumber)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_project_blocks_project_name")
                    .table(ProjectBlocks::Table)
                    .col(ProjectBlocks::ProjectId)
                    .col(ProjectBlocks::Name)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // One stock row per (project, material)
        manager
            .create_index(
                Index::create()
                    .name("idx_stock_balances_project_material")
                    .table(StockBalances::Table)
                    .col(StockBalances::ProjectId)
                    .col(StockBalances::MaterialItemId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_projects_owner_id")
                    .table(Projects::Table)
                    .col(Projects::OwnerId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_projects_assigned_supervisor_id")
                    .table(Projects::Table)
                    .col(Projects::AssignedSupervisorId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_projects_assigned_customer_id")
                    .table(Projects::Table)
                    .col(Projects::AssignedCustomerId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_supervisors_actor_id")
                    .table(Supervisors::Table)
                    .col(Supervisors::ActorId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_customers_actor_id")
                    .table(Customers::Table)
                    .col(Customers::ActorId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_project_expenses_project_id")
                    .table(ProjectExpenses::Table)
                    .col(ProjectExpenses::ProjectId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_project_payments_project_id")
                    .table(ProjectPayments::Table)
                    .col(ProjectPayments::ProjectId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let indexes = [
            ("idx_project_payments_project_id", "project_payments"),
            ("idx_project_expenses_project_id", "project_expenses"),
            ("idx_customers_actor_id", "customers"),
            ("idx_supervisors_actor_id", "supervisors"),
            ("idx_projects_assigned_customer_id", "projects"),
            ("idx_projects_assigned_supervisor_id", "projects"),
            ("idx_projects_owner_id", "projects"),
            ("idx_stock_balances_project_material", "stock_balances"),
            ("idx_project_blocks_project_name", "project_blocks"),
            ("idx_project_units_grid_position", "project_units"),
        ];

        for (name, table) in indexes {
            manager
                .drop_index(
                    Index::drop()
                        .name(name)
                        .table(Alias::new(table))
                        .if_exists()
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }
}
