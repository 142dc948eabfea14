pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_actor_tables;
mod m20250301_000002_create_projects_table;
mod m20250301_000003_create_blocks_and_units_tables;
mod m20250301_000004_create_stock_tables;
mod m20250301_000005_create_finance_tables;
mod m20250301_000006_create_page_access_table;
mod m20250301_000007_add_inventory_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_actor_tables::Migration),
            Box::new(m20250301_000002_create_projects_table::Migration),
            Box::new(m20250301_000003_create_blocks_and_units_tables::Migration),
            Box::new(m20250301_000004_create_stock_tables::Migration),
            Box::new(m20250301_000005_create_finance_tables::Migration),
            Box::new(m20250301_000006_create_page_access_table::Migration),
            Box::new(m20250301_000007_add_inventory_indexes::Migration),
        ]
    }
}
