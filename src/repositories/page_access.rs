use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use sea_orm::{
    sea_query::OnConflict, ActiveValue::Set, DatabaseConnection, EntityTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

use crate::entities::supervisor_page_access::{self, Entity as SupervisorPageAccess};
use crate::errors::ServiceError;

/// Pages a supervisor may open, globally and per project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageAccess {
    #[serde(default)]
    pub global: BTreeSet<String>,
    #[serde(default)]
    pub projects: BTreeMap<i32, BTreeSet<String>>,
}

impl PageAccess {
    /// Drops blank page keys and empty project entries.
    pub fn normalized(mut self) -> Self {
        self.global = self
            .global
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        self.projects = self
            .projects
            .into_iter()
            .map(|(id, pages)| {
                let pages: BTreeSet<String> = pages
                    .into_iter()
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect();
                (id, pages)
            })
            .filter(|(_, pages)| !pages.is_empty())
            .collect();
        self
    }
}

/// Keyed store for supervisor page-access preferences
#[async_trait]
pub trait PageAccessStore: Send + Sync {
    async fn get(&self, supervisor_id: i32) -> Result<Option<PageAccess>, ServiceError>;
    async fn put(&self, supervisor_id: i32, access: PageAccess) -> Result<(), ServiceError>;
    async fn remove(&self, supervisor_id: i32) -> Result<(), ServiceError>;
}

/// Durable store backed by the `supervisor_page_access` table
#[derive(Debug, Clone)]
pub struct DbPageAccessStore {
    db: Arc<DatabaseConnection>,
}

impl DbPageAccessStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PageAccessStore for DbPageAccessStore {
    async fn get(&self, supervisor_id: i32) -> Result<Option<PageAccess>, ServiceError> {
        let row = SupervisorPageAccess::find_by_id(supervisor_id)
            .one(&*self.db)
            .await?;

        match row {
            Some(row) => Ok(Some(serde_json::from_value(row.access)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, supervisor_id: i32, access: PageAccess) -> Result<(), ServiceError> {
        let model = supervisor_page_access::ActiveModel {
            supervisor_id: Set(supervisor_id),
            access: Set(serde_json::to_value(&access)?),
            updated_at: Set(Utc::now()),
        };

        SupervisorPageAccess::insert(model)
            .on_conflict(
                OnConflict::column(supervisor_page_access::Column::SupervisorId)
                    .update_columns([
                        supervisor_page_access::Column::Access,
                        supervisor_page_access::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;

        debug!("Stored page access for supervisor {}", supervisor_id);
        Ok(())
    }

    async fn remove(&self, supervisor_id: i32) -> Result<(), ServiceError> {
        SupervisorPageAccess::delete_by_id(supervisor_id)
            .exec(&*self.db)
            .await?;
        Ok(())
    }
}

/// Process-local store; contents are lost on restart
#[derive(Debug, Default, Clone)]
pub struct InMemoryPageAccessStore {
    entries: Arc<DashMap<i32, PageAccess>>,
}

impl InMemoryPageAccessStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PageAccessStore for InMemoryPageAccessStore {
    async fn get(&self, supervisor_id: i32) -> Result<Option<PageAccess>, ServiceError> {
        Ok(self
            .entries
            .get(&supervisor_id)
            .map(|entry| entry.value().clone()))
    }

    async fn put(&self, supervisor_id: i32, access: PageAccess) -> Result<(), ServiceError> {
        self.entries.insert(supervisor_id, access);
        Ok(())
    }

    async fn remove(&self, supervisor_id: i32) -> Result<(), ServiceError> {
        self.entries.remove(&supervisor_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PageAccess {
        let mut access = PageAccess::default();
        access.global.insert("dashboard".to_string());
        access
            .projects
            .insert(4, BTreeSet::from(["stock".to_string()]));
        access
    }

    #[test]
    fn normalized_drops_blank_entries() {
        let mut access = sample();
        access.global.insert("  ".to_string());
        access.projects.insert(9, BTreeSet::from([" ".to_string()]));

        let access = access.normalized();
        assert_eq!(access.global.len(), 1);
        assert!(!access.projects.contains_key(&9));
    }

    #[test]
    fn json_shape_uses_string_project_keys() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["global"][0], "dashboard");
        assert_eq!(json["projects"]["4"][0], "stock");

        let back: PageAccess = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample());
    }

    #[tokio::test]
    async fn in_memory_store_put_get_remove() {
        let store = InMemoryPageAccessStore::new();
        assert!(store.get(1).await.unwrap().is_none());

        store.put(1, sample()).await.unwrap();
        assert_eq!(store.get(1).await.unwrap(), Some(sample()));

        store.remove(1).await.unwrap();
        assert!(store.get(1).await.unwrap().is_none());
    }
}
