use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub mod page_access;
pub mod unit_repository;

pub use page_access::{DbPageAccessStore, InMemoryPageAccessStore, PageAccess, PageAccessStore};
pub use unit_repository::UnitRepository;

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}
