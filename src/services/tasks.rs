use chrono::Utc;
use metrics::counter;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::recent_changes::{self, RecentChangeService};
use super::users::UserService;
use crate::errors::{ResultExt, ServiceError, ServiceResult};
use crate::models::{
    NewTask, RequestContext, Task, TaskDocument, TaskSearch, TaskStatus, TaskUpdate, User,
};
use crate::repositories::TaskRepository;
use crate::tracing::{current_request_id, scope_optional_request_id};

pub const DEFAULT_JOIN_WORKERS: usize = 3;
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Task workflow: creation with sequential numbers, updates, soft deletion and
/// listings joined with the users each task references.
#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
    users: UserService,
    recent_changes: RecentChangeService,
    join_workers: usize,
    default_page_size: u64,
}

impl TaskService {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        users: UserService,
        recent_changes: RecentChangeService,
    ) -> Self {
        Self {
            tasks,
            users,
            recent_changes,
            join_workers: DEFAULT_JOIN_WORKERS,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets how many workers join tasks with their users concurrently.
    pub fn with_join_workers(mut self, workers: usize) -> Self {
        self.join_workers = workers.max(1);
        self
    }

    /// Page size used by [`TaskService::get_tasks`] when called with `size == 0`.
    pub fn with_default_page_size(mut self, size: u64) -> Self {
        self.default_page_size = size.max(1);
        self
    }

    /// Creates a task in `Ready` state authored by the caller.
    ///
    /// Every referenced user is resolved before anything is written, so a
    /// missing creator or assignee leaves no task and no audit record behind.
    #[instrument(skip(self, ctx, new_task), fields(request_id = %ctx.log_request_id(), user_id = %ctx.user_id, title = %new_task.title))]
    pub async fn save_task(&self, ctx: &RequestContext, new_task: NewTask) -> ServiceResult<Task> {
        new_task.validate()?;

        let creator = self.users.resolve(ctx.user_id, "creator").await?;
        let assignee = match new_task.assigned_id {
            Some(id) => Some(self.users.resolve(id, "assigned").await?),
            None => None,
        };

        let number = self
            .tasks
            .next_task_number()
            .await
            .context("allocating task number")?;
        let now = Utc::now();
        let doc = TaskDocument {
            id: Uuid::new_v4(),
            number,
            title: new_task.title,
            description: new_task.description,
            created_by_id: creator.id,
            updated_by_id: creator.id,
            assigned_id: assignee.as_ref().map(|u| u.id),
            created_at: now,
            updated_at: now,
            status: TaskStatus::Ready,
            is_deleted: false,
        };

        if let Err(e) = self.tasks.save_task(doc.clone()).await {
            error!(error = %e, task_id = %doc.id, "Failed to save task");
            return Err(e).context("saving task");
        }

        counter!("staff_manager.tasks.created", 1);
        info!(task_id = %doc.id, number = doc.number, "Task created");

        if let Some(assignee) = &assignee {
            self.recent_changes
                .record(recent_changes::task_assignment(&doc, assignee, &creator))
                .await?;
        }

        Ok(Task::from_document(doc, creator.clone(), creator, assignee))
    }

    /// Live tasks assigned to `user_id`, most recently updated first.
    #[instrument(skip(self))]
    pub async fn get_user_tasks(&self, user_id: Uuid) -> ServiceResult<Vec<Task>> {
        let docs = self
            .tasks
            .get_user_tasks(user_id)
            .await
            .context("loading user tasks")?;
        self.join_tasks(docs).await
    }

    /// Live tasks assigned to the caller.
    pub async fn get_my_tasks(&self, ctx: &RequestContext) -> ServiceResult<Vec<Task>> {
        self.get_user_tasks(ctx.user_id).await
    }

    /// A page of live tasks, most recently updated first. A `size` of 0 asks
    /// for the default page size.
    #[instrument(skip(self))]
    pub async fn get_tasks(&self, from: u64, size: u64) -> ServiceResult<Vec<Task>> {
        let size = if size == 0 { self.default_page_size } else { size };
        let docs = self
            .tasks
            .get_tasks(from, size)
            .await
            .context("loading tasks")?;
        debug!(count = docs.len(), "Tasks page loaded");
        self.join_tasks(docs).await
    }

    /// Soft-deleted tasks are returned too, flagged by `is_deleted`.
    #[instrument(skip(self))]
    pub async fn get_task_by_id(&self, id: Uuid) -> ServiceResult<Task> {
        let doc = self
            .tasks
            .get_task_by_id(id)
            .await
            .context("loading task")?;
        join_task(&self.users, doc).await
    }

    /// Replaces the mutable fields of a task.
    ///
    /// Number, creator and creation time always come from the stored task.
    /// Changing the assignee records an `Assignment`, changing the status a
    /// `TaskStatusChange`.
    #[instrument(skip(self, ctx, patch), fields(request_id = %ctx.log_request_id(), user_id = %ctx.user_id, task_id = %patch.id, status = %patch.status))]
    pub async fn update(&self, ctx: &RequestContext, patch: TaskUpdate) -> ServiceResult<Task> {
        patch.validate()?;

        let stored = self
            .tasks
            .get_task_by_id(patch.id)
            .await
            .context("loading task for update")?;
        if stored.is_deleted {
            return Err(ServiceError::InvalidData(format!(
                "task with id = {} is deleted",
                stored.id
            )));
        }
        if patch.number.is_some_and(|n| n != stored.number) {
            debug!(task_id = %stored.id, "Ignoring client supplied task number");
        }

        let updated = TaskDocument {
            title: patch.title,
            description: patch.description,
            assigned_id: patch.assigned_id,
            status: patch.status,
            updated_by_id: ctx.user_id,
            updated_at: Utc::now(),
            ..stored.clone()
        };

        let task = join_task(&self.users, updated.clone()).await?;

        self.tasks
            .update_task(updated.clone())
            .await
            .context("updating task")?;
        info!(task_id = %updated.id, number = updated.number, "Task updated");

        let actor = &task.updated_by;
        if stored.assigned_id != updated.assigned_id {
            if let Some(assignee) = &task.assigned {
                self.recent_changes
                    .record(recent_changes::task_assignment(&updated, assignee, actor))
                    .await?;
            }
        }
        if stored.status != updated.status {
            let subject = task.assigned.as_ref().unwrap_or(&task.created_by);
            self.recent_changes
                .record(recent_changes::task_status_change(&updated, subject, actor))
                .await?;
        }

        Ok(task)
    }

    /// Marks a task deleted. It disappears from listings and searches but can
    /// still be fetched by id. Deleting an already deleted task is a no-op.
    #[instrument(skip(self, ctx), fields(request_id = %ctx.log_request_id(), user_id = %ctx.user_id))]
    pub async fn delete_task(&self, ctx: &RequestContext, id: Uuid) -> ServiceResult<()> {
        let stored = self
            .tasks
            .get_task_by_id(id)
            .await
            .context("loading task for deletion")?;
        if stored.is_deleted {
            debug!(task_id = %id, "Task already deleted");
            return Ok(());
        }

        let deleted = TaskDocument {
            is_deleted: true,
            updated_by_id: ctx.user_id,
            updated_at: Utc::now(),
            ..stored
        };
        let task = join_task(&self.users, deleted.clone()).await?;

        self.tasks
            .update_task(deleted.clone())
            .await
            .context("deleting task")?;
        counter!("staff_manager.tasks.deleted", 1);
        info!(task_id = %id, number = deleted.number, "Task deleted");

        let subject = task.assigned.as_ref().unwrap_or(&task.created_by);
        self.recent_changes
            .record(recent_changes::task_deletion(&deleted, subject, &task.updated_by))
            .await
    }

    /// Live tasks whose number equals a numeric query, or whose title contains it.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &TaskSearch) -> ServiceResult<Vec<Task>> {
        let docs = self
            .tasks
            .search(query, None)
            .await
            .context("searching tasks")?;
        self.join_tasks(docs).await
    }

    /// Like [`TaskService::search`], restricted to tasks assigned to `user_id`.
    #[instrument(skip(self))]
    pub async fn search_for_user(
        &self,
        query: &TaskSearch,
        user_id: Uuid,
    ) -> ServiceResult<Vec<Task>> {
        let docs = self
            .tasks
            .search(query, Some(user_id))
            .await
            .context("searching user tasks")?;
        self.join_tasks(docs).await
    }

    /// Joins every document with its users on a bounded pool of workers.
    ///
    /// The output keeps the input order. The first failure cancels the
    /// remaining work and fails the whole batch.
    async fn join_tasks(&self, docs: Vec<TaskDocument>) -> ServiceResult<Vec<Task>> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }

        let total = docs.len();
        let workers = self.join_workers.clamp(1, total);
        let (work_tx, work_rx) = flume::bounded::<(usize, TaskDocument)>(workers);
        let (result_tx, mut result_rx) = mpsc::channel::<ServiceResult<(usize, Task)>>(workers);
        let cancel = CancellationToken::new();
        let request_id = current_request_id();

        let mut pool = JoinSet::new();
        for _ in 0..workers {
            pool.spawn(scope_optional_request_id(
                request_id.clone(),
                join_worker(
                    self.users.clone(),
                    work_rx.clone(),
                    result_tx.clone(),
                    cancel.clone(),
                ),
            ));
        }
        drop(work_rx);
        drop(result_tx);

        let producer_cancel = cancel.clone();
        pool.spawn(async move {
            for item in docs.into_iter().enumerate() {
                tokio::select! {
                    biased;
                    _ = producer_cancel.cancelled() => return,
                    sent = work_tx.send_async(item) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                }
            }
        });

        let mut joined = Vec::with_capacity(total);
        while joined.len() < total {
            match result_rx.recv().await {
                Some(Ok(item)) => joined.push(item),
                Some(Err(e)) => {
                    cancel.cancel();
                    warn!(error = %e, "Joining tasks with users failed");
                    return Err(e);
                }
                None => {
                    cancel.cancel();
                    return Err(ServiceError::InternalError(
                        "task join workers stopped before finishing".to_string(),
                    ));
                }
            }
        }
        drop(pool);

        joined.sort_by_key(|(index, _)| *index);
        Ok(joined.into_iter().map(|(_, task)| task).collect())
    }
}

async fn join_worker(
    users: UserService,
    work: flume::Receiver<(usize, TaskDocument)>,
    results: mpsc::Sender<ServiceResult<(usize, Task)>>,
    cancel: CancellationToken,
) {
    loop {
        let (index, doc) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            next = work.recv_async() => match next {
                Ok(item) => item,
                Err(_) => return,
            },
        };

        let result = join_task(&users, doc).await.map(|task| (index, task));
        let failed = result.is_err();
        if cancel.is_cancelled() || results.send(result).await.is_err() || failed {
            return;
        }
    }
}

/// Resolves the assignee, the creator and the last updater of `doc`, in that order.
async fn join_task(users: &UserService, doc: TaskDocument) -> ServiceResult<Task> {
    let assigned: Option<User> = match doc.assigned_id {
        Some(id) => Some(users.resolve(id, "assigned").await?),
        None => None,
    };
    let created_by = users.resolve(doc.created_by_id, "creator").await?;
    let updated_by = if doc.updated_by_id == doc.created_by_id {
        created_by.clone()
    } else {
        users.resolve(doc.updated_by_id, "updater").await?
    };
    Ok(Task::from_document(doc, created_by, updated_by, assigned))
}
