use async_trait::async_trait;
use dashmap::DashMap;
#[cfg(test)]
use mockall::automock;
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::recent_change::{self, ActiveModel, Column, Entity as RecentChange, Model};
use crate::errors::{ResultExt, ServiceResult};
use crate::repositories::Repository;

use super::BaseRepository;

/// Append-only storage of audit records.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecentChangeRepository: Send + Sync {
    async fn save(&self, change: recent_change::Model) -> ServiceResult<()>;
    /// Records where `user_id` is the subject or the owner, newest first.
    async fn get_user_changes(&self, user_id: Uuid) -> ServiceResult<Vec<recent_change::Model>>;
}

/// Relational repository for the `recent_changes` table
#[derive(Debug, Clone)]
pub struct SeaOrmRecentChangeRepository {
    base: BaseRepository,
}

impl SeaOrmRecentChangeRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

fn active_model(change: Model) -> ActiveModel {
    ActiveModel {
        id: Set(change.id),
        title: Set(change.title),
        incident_id: Set(change.incident_id),
        change_type: Set(change.change_type),
        user_name: Set(change.user_name),
        user_id: Set(change.user_id),
        owner_id: Set(change.owner_id),
        updated_by_name: Set(change.updated_by_name),
        updated_by_id: Set(change.updated_by_id),
        change_time: Set(change.change_time),
        status: Set(change.status),
    }
}

#[async_trait]
impl RecentChangeRepository for SeaOrmRecentChangeRepository {
    async fn save(&self, change: Model) -> ServiceResult<()> {
        RecentChange::insert(active_model(change))
            .exec_without_returning(self.base.get_db())
            .await
            .context("inserting recent change")?;
        Ok(())
    }

    async fn get_user_changes(&self, user_id: Uuid) -> ServiceResult<Vec<Model>> {
        RecentChange::find()
            .filter(
                Condition::any()
                    .add(Column::UserId.eq(user_id))
                    .add(Column::OwnerId.eq(user_id)),
            )
            .order_by_desc(Column::ChangeTime)
            .all(self.base.get_db())
            .await
            .context("loading recent changes")
    }
}

/// Audit log kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryRecentChangeRepository {
    changes: DashMap<Uuid, Model>,
}

impl InMemoryRecentChangeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

#[async_trait]
impl RecentChangeRepository for InMemoryRecentChangeRepository {
    async fn save(&self, change: Model) -> ServiceResult<()> {
        self.changes.insert(change.id, change);
        Ok(())
    }

    async fn get_user_changes(&self, user_id: Uuid) -> ServiceResult<Vec<Model>> {
        let mut changes: Vec<Model> = self
            .changes
            .iter()
            .filter(|entry| entry.value().concerns(user_id))
            .map(|entry| entry.value().clone())
            .collect();
        changes.sort_by(|a, b| b.change_time.cmp(&a.change_time));
        Ok(changes)
    }
}
