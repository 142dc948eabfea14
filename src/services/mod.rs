// Actor resolution and project visibility
pub mod access_scope;
pub mod identity;

// Unit inventory
pub mod inventory_generator;
pub mod unit_lifecycle;
pub mod units;

// Project structure
pub mod blocks;
pub mod projects;

// Materials
pub mod stock;

// Management views
pub mod dashboard;
pub mod supervisors;

// Service factory for dependency injection
pub mod factory;

pub use access_scope::{AccessScopeResolver, ProjectOrdering, ProjectScope};
pub use identity::{DeclaredRole, Identity, IdentityResolver};
