pub mod actor_profile;
pub mod customer;
pub mod material_item;
pub mod project;
pub mod project_block;
pub mod project_expense;
pub mod project_payment;
pub mod project_unit;
pub mod stock_balance;
pub mod supervisor;
pub mod supervisor_page_access;

pub use project::{ProjectConfiguration, ProjectStatus};
pub use project_unit::{CrmStage, UnitStatus};
