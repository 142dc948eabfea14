use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use std::collections::HashSet;
use std::sync::Arc;

use crate::entities::project_unit::{self, Column, Entity as ProjectUnit, Model as UnitModel};
use crate::errors::ServiceError;
use crate::repositories::Repository;

use super::BaseRepository;

/// Rows per INSERT statement when persisting a generated grid
const INSERT_CHUNK_SIZE: usize = 200;

/// Repository for unit grid reads and batch inserts
#[derive(Debug, Clone)]
pub struct UnitRepository {
    base: BaseRepository,
}

impl UnitRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// (floor_number, unit_number) pairs already present in a block
    pub async fn existing_keys<C>(
        &self,
        conn: &C,
        block_id: i32,
    ) -> Result<HashSet<(i32, i32)>, ServiceError>
    where
        C: ConnectionTrait,
    {
        let keys: Vec<(i32, i32)> = ProjectUnit::find()
            .select_only()
            .column(Column::FloorNumber)
            .column(Column::UnitNumber)
            .filter(Column::BlockId.eq(block_id))
            .into_tuple()
            .all(conn)
            .await?;

        Ok(keys.into_iter().collect())
    }

    /// Units of several blocks, ordered for grid rendering
    pub async fn find_by_blocks(&self, block_ids: &[i32]) -> Result<Vec<UnitModel>, ServiceError> {
        if block_ids.is_empty() {
            return Ok(Vec::new());
        }

        ProjectUnit::find()
            .filter(Column::BlockId.is_in(block_ids.iter().copied()))
            .order_by_asc(Column::BlockId)
            .order_by_desc(Column::FloorNumber)
            .order_by_asc(Column::UnitNumber)
            .all(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Inserts all rows on the given connection, chunked to keep statements bounded.
    ///
    /// Callers pass a transaction so a failing chunk leaves no rows behind.
    pub async fn insert_batch<C>(
        &self,
        conn: &C,
        rows: Vec<project_unit::ActiveModel>,
    ) -> Result<u64, sea_orm::DbErr>
    where
        C: ConnectionTrait,
    {
        let mut inserted = 0;
        let mut rows = rows.into_iter().peekable();

        while rows.peek().is_some() {
            let chunk: Vec<_> = rows.by_ref().take(INSERT_CHUNK_SIZE).collect();
            inserted += ProjectUnit::insert_many(chunk)
                .exec_without_returning(conn)
                .await?;
        }

        Ok(inserted)
    }
}

impl Repository for UnitRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
