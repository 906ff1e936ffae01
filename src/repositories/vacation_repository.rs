use async_trait::async_trait;
use dashmap::DashMap;
#[cfg(test)]
use mockall::automock;
use sea_orm::{
    ActiveEnum, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, Set, TransactionTrait,
};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::vacation::{
    self, ActiveModel, Column, Entity as Vacation, Model, VacationStatus,
};
use crate::errors::{ResultExt, ServiceError, ServiceResult};
use crate::repositories::Repository;

use super::BaseRepository;

/// Storage of vacation records. Every listing is ordered by start date.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VacationRepository: Send + Sync {
    /// Inserts `vacation` under the next free number and returns the stored record.
    /// The incoming `number` is ignored.
    async fn save(&self, vacation: vacation::Model) -> ServiceResult<vacation::Model>;
    /// Replaces a stored record; fails with `NotFound` for unknown ids.
    async fn update(&self, vacation: vacation::Model) -> ServiceResult<()>;
    /// Pending, approved and rejected vacations of everybody.
    async fn get_all(&self) -> ServiceResult<Vec<vacation::Model>>;
    async fn get_pending(&self) -> ServiceResult<Vec<vacation::Model>>;
    /// Every vacation of `user_id`, whatever its status.
    async fn get_for_user(&self, user_id: Uuid) -> ServiceResult<Vec<vacation::Model>>;
    async fn get_pending_for_user(&self, user_id: Uuid) -> ServiceResult<Vec<vacation::Model>>;
    async fn get_by_id(&self, id: Uuid) -> ServiceResult<vacation::Model>;
}

fn active_model(vacation: Model) -> ActiveModel {
    ActiveModel {
        id: Set(vacation.id),
        number: Set(vacation.number),
        user_id: Set(vacation.user_id),
        user_full_name: Set(vacation.user_full_name),
        start_date: Set(vacation.start_date),
        end_date: Set(vacation.end_date),
        status: Set(vacation.status),
        status_changer_id: Set(vacation.status_changer_id),
        status_changer_full_name: Set(vacation.status_changer_full_name),
        update_time: Set(vacation.update_time),
        was_approved: Set(vacation.was_approved),
    }
}

fn missing(id: Uuid) -> ServiceError {
    ServiceError::not_found(format!("vacation with id = {} not found", id))
}

/// Relational repository for the `vacations` table
#[derive(Debug, Clone)]
pub struct SeaOrmVacationRepository {
    base: BaseRepository,
}

impl SeaOrmVacationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    async fn list(&self, query: Select<Vacation>, operation: &str) -> ServiceResult<Vec<Model>> {
        query
            .order_by_asc(Column::StartDate)
            .all(self.base.get_db())
            .await
            .context(operation)
    }
}

#[async_trait]
impl VacationRepository for SeaOrmVacationRepository {
    async fn save(&self, mut vacation: Model) -> ServiceResult<Model> {
        let txn = self
            .base
            .get_db()
            .begin()
            .await
            .context("starting vacation transaction")?;

        let max_number: Option<i64> = Vacation::find()
            .select_only()
            .column_as(Column::Number.max(), "max_number")
            .into_tuple::<Option<i64>>()
            .one(&txn)
            .await
            .context("reading max vacation number")?
            .flatten();
        vacation.number = max_number.unwrap_or(0) + 1;

        Vacation::insert(active_model(vacation.clone()))
            .exec_without_returning(&txn)
            .await
            .context("inserting vacation")?;

        txn.commit().await.context("committing vacation")?;
        Ok(vacation)
    }

    async fn update(&self, vacation: Model) -> ServiceResult<()> {
        let id = vacation.id;
        let result = Vacation::update_many()
            .set(active_model(vacation))
            .filter(Column::Id.eq(id))
            .exec(self.base.get_db())
            .await
            .context("updating vacation")?;

        if result.rows_affected == 0 {
            return Err(missing(id));
        }
        Ok(())
    }

    async fn get_all(&self) -> ServiceResult<Vec<Model>> {
        let actual = [
            VacationStatus::Pending,
            VacationStatus::Approved,
            VacationStatus::Rejected,
        ];
        self.list(
            Vacation::find().filter(Column::Status.is_in(actual.into_iter().map(|s| s.into_value()))),
            "loading vacations",
        )
        .await
    }

    async fn get_pending(&self) -> ServiceResult<Vec<Model>> {
        self.list(
            Vacation::find().filter(Column::Status.eq(VacationStatus::Pending.into_value())),
            "loading pending vacations",
        )
        .await
    }

    async fn get_for_user(&self, user_id: Uuid) -> ServiceResult<Vec<Model>> {
        self.list(
            Vacation::find().filter(Column::UserId.eq(user_id)),
            "loading user vacations",
        )
        .await
    }

    async fn get_pending_for_user(&self, user_id: Uuid) -> ServiceResult<Vec<Model>> {
        self.list(
            Vacation::find()
                .filter(Column::UserId.eq(user_id))
                .filter(Column::Status.eq(VacationStatus::Pending.into_value())),
            "loading pending user vacations",
        )
        .await
    }

    async fn get_by_id(&self, id: Uuid) -> ServiceResult<Model> {
        Vacation::find_by_id(id)
            .one(self.base.get_db())
            .await
            .context("loading vacation")?
            .ok_or_else(|| missing(id))
    }
}

/// Vacation table kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryVacationRepository {
    vacations: DashMap<Uuid, Model>,
    last_number: AtomicI64,
}

impl InMemoryVacationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn matching<F>(&self, predicate: F) -> Vec<Model>
    where
        F: Fn(&Model) -> bool,
    {
        let mut found: Vec<Model> = self
            .vacations
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| {
            a.start_date
                .cmp(&b.start_date)
                .then_with(|| a.number.cmp(&b.number))
        });
        found
    }
}

#[async_trait]
impl VacationRepository for InMemoryVacationRepository {
    async fn save(&self, mut vacation: Model) -> ServiceResult<Model> {
        vacation.number = self.last_number.fetch_add(1, Ordering::SeqCst) + 1;
        self.vacations.insert(vacation.id, vacation.clone());
        Ok(vacation)
    }

    async fn update(&self, vacation: Model) -> ServiceResult<()> {
        match self.vacations.get_mut(&vacation.id) {
            Some(mut entry) => {
                *entry = vacation;
                Ok(())
            }
            None => Err(missing(vacation.id)),
        }
    }

    async fn get_all(&self) -> ServiceResult<Vec<Model>> {
        Ok(self.matching(|v| v.status.is_actual()))
    }

    async fn get_pending(&self) -> ServiceResult<Vec<Model>> {
        Ok(self.matching(|v| v.status == VacationStatus::Pending))
    }

    async fn get_for_user(&self, user_id: Uuid) -> ServiceResult<Vec<Model>> {
        Ok(self.matching(|v| v.user_id == user_id))
    }

    async fn get_pending_for_user(&self, user_id: Uuid) -> ServiceResult<Vec<Model>> {
        Ok(self.matching(|v| v.user_id == user_id && v.status == VacationStatus::Pending))
    }

    async fn get_by_id(&self, id: Uuid) -> ServiceResult<Model> {
        self.vacations
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| missing(id))
    }
}
