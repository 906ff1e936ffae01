use chrono::Utc;
use metrics::counter;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::entities::recent_change::{ChangeType, Model as RecentChange};
use crate::entities::vacation::Model as VacationRecord;
use crate::errors::{ResultExt, ServiceResult};
use crate::models::{RequestContext, TaskDocument, User};
use crate::repositories::RecentChangeRepository;

/// Records and reads the audit trail of task and vacation mutations.
#[derive(Clone)]
pub struct RecentChangeService {
    repo: Arc<dyn RecentChangeRepository>,
}

impl RecentChangeService {
    pub fn new(repo: Arc<dyn RecentChangeRepository>) -> Self {
        Self { repo }
    }

    /// Appends one audit record.
    ///
    /// Failures are returned to the caller; the mutation that triggered the
    /// record stays persisted.
    #[instrument(skip(self, change), fields(change_type = %change.change_type, incident_id = %change.incident_id))]
    pub async fn record(&self, change: RecentChange) -> ServiceResult<()> {
        let change_type = change.change_type.to_string();
        match self.repo.save(change).await.context("recording recent change") {
            Ok(()) => {
                counter!("staff_manager.audit.recorded", 1, "type" => change_type);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to record recent change");
                counter!("staff_manager.audit.failed", 1, "type" => change_type);
                Err(e)
            }
        }
    }

    /// Changes where `user_id` is the subject or the owner, newest first.
    #[instrument(skip(self))]
    pub async fn get_user_changes(&self, user_id: Uuid) -> ServiceResult<Vec<RecentChange>> {
        let changes = self
            .repo
            .get_user_changes(user_id)
            .await
            .context("loading recent changes")?;
        info!(user_id = %user_id, count = changes.len(), "Recent changes loaded");
        Ok(changes)
    }

    /// Changes concerning the caller.
    pub async fn get_recent_changes(&self, ctx: &RequestContext) -> ServiceResult<Vec<RecentChange>> {
        self.get_user_changes(ctx.user_id).await
    }
}

fn new_change(
    title: String,
    incident_id: Uuid,
    change_type: ChangeType,
    subject: &User,
    owner_id: Uuid,
    actor: Option<&User>,
    status: String,
) -> RecentChange {
    RecentChange {
        id: Uuid::new_v4(),
        title,
        incident_id,
        change_type,
        user_name: subject.full_name(),
        user_id: subject.id,
        owner_id,
        updated_by_name: actor.map(User::full_name),
        updated_by_id: actor.map(|u| u.id),
        change_time: Utc::now(),
        status,
    }
}

/// `assignee` was put on `task` by `actor`.
pub fn task_assignment(task: &TaskDocument, assignee: &User, actor: &User) -> RecentChange {
    new_change(
        task.label(),
        task.id,
        ChangeType::Assignment,
        assignee,
        task.created_by_id,
        Some(actor),
        task.status.to_string(),
    )
}

/// `actor` moved `task` to its current status; `subject` is the assignee, or
/// the creator for unassigned tasks.
pub fn task_status_change(task: &TaskDocument, subject: &User, actor: &User) -> RecentChange {
    new_change(
        task.label(),
        task.id,
        ChangeType::TaskStatusChange,
        subject,
        task.created_by_id,
        Some(actor),
        task.status.to_string(),
    )
}

pub fn task_deletion(task: &TaskDocument, subject: &User, actor: &User) -> RecentChange {
    new_change(
        task.label(),
        task.id,
        ChangeType::TaskDeletion,
        subject,
        task.created_by_id,
        Some(actor),
        task.status.to_string(),
    )
}

/// `owner` asked for `vacation`.
pub fn vacation_request(vacation: &VacationRecord, owner: &User) -> RecentChange {
    new_change(
        format!("{} Vacation", vacation.number),
        vacation.id,
        ChangeType::VacationRequest,
        owner,
        owner.id,
        None,
        vacation.status.to_string(),
    )
}

/// `changer` reviewed `vacation`. The record is filed under the reviewer as
/// owner so both sides see the decision in their recent changes.
pub fn vacation_status_change(vacation: &VacationRecord, owner: &User, changer: &User) -> RecentChange {
    new_change(
        format!("{} Vacation {}", vacation.number, vacation.status),
        vacation.id,
        ChangeType::VacationStatusChange,
        owner,
        changer.id,
        Some(changer),
        vacation.status.to_string(),
    )
}
