use async_trait::async_trait;
use dashmap::DashMap;
#[cfg(test)]
use mockall::automock;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::errors::{ServiceError, ServiceResult};
use crate::models::{TaskDocument, TaskSearch};

/// Name of the document index holding tasks.
pub const TASKS_INDEX: &str = "tasks";

/// Document storage of tasks. Users are referenced by id only; joining them in
/// is the task engine's job.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Live tasks assigned to `user_id`, most recently updated first.
    async fn get_user_tasks(&self, user_id: Uuid) -> ServiceResult<Vec<TaskDocument>>;
    async fn save_task(&self, task: TaskDocument) -> ServiceResult<()>;
    /// A page of live tasks, most recently updated first.
    async fn get_tasks(&self, from: u64, size: u64) -> ServiceResult<Vec<TaskDocument>>;
    /// Returns soft-deleted tasks too; fails with `NotFound` for unknown ids.
    async fn get_task_by_id(&self, id: Uuid) -> ServiceResult<TaskDocument>;
    /// Reserves the next task number. Numbers are unique and strictly increasing.
    async fn next_task_number(&self) -> ServiceResult<u64>;
    /// Replaces a stored task; fails with `NotFound` for unknown ids.
    async fn update_task(&self, task: TaskDocument) -> ServiceResult<()>;
    /// Removes the document outright. The engine soft-deletes through `update_task`.
    async fn delete_task(&self, id: Uuid) -> ServiceResult<()>;
    /// Live tasks matching `query`, restricted to one assignee when given.
    async fn search(
        &self,
        query: &TaskSearch,
        assigned_to: Option<Uuid>,
    ) -> ServiceResult<Vec<TaskDocument>>;
}

/// Document-store stand-in for the `tasks` index.
#[derive(Debug, Default)]
pub struct InMemoryTaskRepository {
    tasks: DashMap<Uuid, TaskDocument>,
    last_number: AtomicU64,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store; numbering continues after the highest seeded number.
    pub fn with_tasks(tasks: impl IntoIterator<Item = TaskDocument>) -> Self {
        let repo = Self::new();
        for task in tasks {
            repo.last_number.fetch_max(task.number, Ordering::SeqCst);
            repo.tasks.insert(task.id, task);
        }
        repo
    }

    fn live_matching<F>(&self, predicate: F) -> Vec<TaskDocument>
    where
        F: Fn(&TaskDocument) -> bool,
    {
        let mut found: Vec<TaskDocument> = self
            .tasks
            .iter()
            .filter(|entry| !entry.value().is_deleted && predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.number.cmp(&a.number))
        });
        found
    }

    fn missing(id: Uuid) -> ServiceError {
        ServiceError::not_found(format!("{}/{} not found", TASKS_INDEX, id))
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn get_user_tasks(&self, user_id: Uuid) -> ServiceResult<Vec<TaskDocument>> {
        Ok(self.live_matching(|task| task.assigned_id == Some(user_id)))
    }

    async fn save_task(&self, task: TaskDocument) -> ServiceResult<()> {
        self.last_number.fetch_max(task.number, Ordering::SeqCst);
        self.tasks.insert(task.id, task);
        Ok(())
    }

    async fn get_tasks(&self, from: u64, size: u64) -> ServiceResult<Vec<TaskDocument>> {
        Ok(self
            .live_matching(|_| true)
            .into_iter()
            .skip(from as usize)
            .take(size as usize)
            .collect())
    }

    async fn get_task_by_id(&self, id: Uuid) -> ServiceResult<TaskDocument> {
        self.tasks
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Self::missing(id))
    }

    async fn next_task_number(&self) -> ServiceResult<u64> {
        Ok(self.last_number.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn update_task(&self, task: TaskDocument) -> ServiceResult<()> {
        match self.tasks.get_mut(&task.id) {
            Some(mut entry) => {
                *entry = task;
                Ok(())
            }
            None => Err(Self::missing(task.id)),
        }
    }

    async fn delete_task(&self, id: Uuid) -> ServiceResult<()> {
        self.tasks
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Self::missing(id))
    }

    async fn search(
        &self,
        query: &TaskSearch,
        assigned_to: Option<Uuid>,
    ) -> ServiceResult<Vec<TaskDocument>> {
        Ok(self.live_matching(|task| {
            assigned_to.map_or(true, |user_id| task.assigned_id == Some(user_id))
                && query.matches(task)
        }))
    }
}
