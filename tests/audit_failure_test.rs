use std::sync::Arc;

use async_trait::async_trait;
use staff_manager::config::AppConfig;
use staff_manager::entities::recent_change;
use staff_manager::errors::{ErrorKind, ServiceError, ServiceResult};
use staff_manager::models::{NewTask, RequestContext, Role, User};
use staff_manager::repositories::{InMemoryUserRepository, RecentChangeRepository};
use staff_manager::{Repositories, StaffServices};
use uuid::Uuid;

struct UnavailableAuditLog;

#[async_trait]
impl RecentChangeRepository for UnavailableAuditLog {
    async fn save(&self, _change: recent_change::Model) -> ServiceResult<()> {
        Err(ServiceError::InternalError("audit log unavailable".into()))
    }

    async fn get_user_changes(&self, _user_id: Uuid) -> ServiceResult<Vec<recent_change::Model>> {
        Ok(Vec::new())
    }
}

fn user(first: &str, role: Role) -> User {
    User {
        id: Uuid::new_v4(),
        first_name: first.into(),
        last_name: "Doe".into(),
        position: "Engineer".into(),
        role,
        email: format!("{}@example.com", first.to_lowercase()),
        mobile_phone: None,
        date_of_birth: None,
    }
}

#[tokio::test]
async fn audit_failure_is_reported_and_task_stays_persisted() {
    let carol = user("Carol", Role::Admin);
    let dave = user("Dave", Role::User);
    let repos = Repositories {
        users: Arc::new(InMemoryUserRepository::with_users([carol.clone(), dave.clone()])),
        recent_changes: Arc::new(UnavailableAuditLog),
        ..Repositories::in_memory()
    };
    let services = StaffServices::new(repos, &AppConfig::default());

    let err = services
        .tasks
        .save_task(
            &RequestContext::admin(carol.id),
            NewTask::new("Rotate keys", "quarterly").assigned_to(dave.id),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);

    let persisted = services.tasks.get_user_tasks(dave.id).await.unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].number, 1);
}

#[tokio::test]
async fn unassigned_task_needs_no_audit_record() {
    let carol = user("Carol", Role::User);
    let repos = Repositories {
        users: Arc::new(InMemoryUserRepository::with_users([carol.clone()])),
        recent_changes: Arc::new(UnavailableAuditLog),
        ..Repositories::in_memory()
    };
    let services = StaffServices::new(repos, &AppConfig::default());

    let task = services
        .tasks
        .save_task(&RequestContext::user(carol.id), NewTask::new("Tidy backlog", "-"))
        .await
        .unwrap();
    assert!(task.assigned.is_none());
}
