mod common;

use assert_matches::assert_matches;
use staff_manager::entities::recent_change::ChangeType;
use staff_manager::errors::ServiceError;
use staff_manager::models::{NewTask, Role, TaskSearch, TaskStatus, TaskUpdate};
use staff_manager::tracing::{scope_request_id, RequestId};
use uuid::Uuid;

use common::TestApp;

#[tokio::test]
async fn task_numbers_start_at_one_and_increase() {
    let app = TestApp::new();
    let carol = app.seed_user("Carol", "Smith", Role::User).await;
    let ctx = TestApp::ctx(&carol);

    let mut numbers = Vec::new();
    for i in 0..5 {
        let task = app
            .services
            .tasks
            .save_task(&ctx, NewTask::new(format!("Task {}", i), "details"))
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Ready);
        assert_eq!(task.created_by.id, carol.id);
        numbers.push(task.number);
    }
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn concurrent_creation_yields_unique_numbers() {
    let app = TestApp::new();
    let carol = app.seed_user("Carol", "Smith", Role::User).await;
    let ctx = TestApp::ctx(&carol);

    let mut handles = Vec::new();
    for i in 0..20 {
        let tasks = app.services.tasks.clone();
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            tasks
                .save_task(&ctx, NewTask::new(format!("Task {}", i), "details"))
                .await
                .map(|t| t.number)
        }));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap().unwrap());
    }
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=20).collect::<Vec<u64>>());
}

#[tokio::test]
async fn assigned_task_records_assignment_for_assignee_and_creator() {
    let app = TestApp::new();
    let carol = app.seed_user("Carol", "Smith", Role::Admin).await;
    let dave = app.seed_user("Dave", "Jones", Role::User).await;

    let task = app
        .services
        .tasks
        .save_task(
            &TestApp::ctx(&carol),
            NewTask::new("Fix bug", "crash on login").assigned_to(dave.id),
        )
        .await
        .unwrap();
    assert_eq!(task.assigned.as_ref().map(|u| u.id), Some(dave.id));

    for user_id in [dave.id, carol.id] {
        let changes = app
            .services
            .recent_changes
            .get_user_changes(user_id)
            .await
            .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, ChangeType::Assignment);
        assert_eq!(changes[0].title, format!("{} Fix bug", task.number));
        assert_eq!(changes[0].user_name, "Dave Jones");
        assert_eq!(changes[0].incident_id, task.id);
    }
}

#[tokio::test]
async fn missing_assignee_persists_nothing() {
    let app = TestApp::new();
    let carol = app.seed_user("Carol", "Smith", Role::User).await;

    let err = app
        .services
        .tasks
        .save_task(
            &TestApp::ctx(&carol),
            NewTask::new("Orphan", "nobody").assigned_to(Uuid::new_v4()),
        )
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::NotFound(_));
    assert!(app.services.tasks.get_tasks(0, 50).await.unwrap().is_empty());
    assert!(app.recent_changes.is_empty());
}

#[tokio::test]
async fn update_keeps_immutable_fields_and_audits_status_change() {
    let app = TestApp::new();
    let carol = app.seed_user("Carol", "Smith", Role::Admin).await;
    let dave = app.seed_user("Dave", "Jones", Role::User).await;
    let created = app
        .services
        .tasks
        .save_task(
            &TestApp::ctx(&carol),
            NewTask::new("Ship release", "v1.2").assigned_to(dave.id),
        )
        .await
        .unwrap();

    let mut patch = TaskUpdate::from_task(&created).with_status(TaskStatus::InProgress);
    patch.number = Some(999);
    patch.created_by_id = Some(dave.id);
    patch.created_at = Some(created.created_at - chrono::Duration::days(30));

    let updated = app
        .services
        .tasks
        .update(&TestApp::ctx(&dave), patch)
        .await
        .unwrap();

    assert_eq!(updated.number, created.number);
    assert_eq!(updated.created_by.id, carol.id);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.updated_by.id, dave.id);
    assert_eq!(updated.status, TaskStatus::InProgress);
    assert!(updated.updated_at >= created.updated_at);

    let changes = app
        .services
        .recent_changes
        .get_user_changes(carol.id)
        .await
        .unwrap();
    let status_changes: Vec<_> = changes
        .iter()
        .filter(|c| c.change_type == ChangeType::TaskStatusChange)
        .collect();
    assert_eq!(status_changes.len(), 1);
    assert_eq!(status_changes[0].status, "InProgress");
    assert_eq!(status_changes[0].updated_by_id, Some(dave.id));
}

#[tokio::test]
async fn reassignment_records_new_assignee() {
    let app = TestApp::new();
    let carol = app.seed_user("Carol", "Smith", Role::Admin).await;
    let dave = app.seed_user("Dave", "Jones", Role::User).await;
    let erin = app.seed_user("Erin", "Brown", Role::User).await;
    let ctx = TestApp::ctx(&carol);

    let task = app
        .services
        .tasks
        .save_task(&ctx, NewTask::new("Review PR", "#42").assigned_to(dave.id))
        .await
        .unwrap();
    app.services
        .tasks
        .update(&ctx, TaskUpdate::from_task(&task).with_assignee(Some(erin.id)))
        .await
        .unwrap();

    let erin_changes = app
        .services
        .recent_changes
        .get_user_changes(erin.id)
        .await
        .unwrap();
    assert_eq!(erin_changes.len(), 1);
    assert_eq!(erin_changes[0].change_type, ChangeType::Assignment);

    assert!(app.services.tasks.get_user_tasks(dave.id).await.unwrap().is_empty());
    assert_eq!(app.services.tasks.get_user_tasks(erin.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_to_missing_assignee_leaves_task_untouched() {
    let app = TestApp::new();
    let carol = app.seed_user("Carol", "Smith", Role::User).await;
    let ctx = TestApp::ctx(&carol);
    let task = app
        .services
        .tasks
        .save_task(&ctx, NewTask::new("Write docs", "api"))
        .await
        .unwrap();

    let err = app
        .services
        .tasks
        .update(&ctx, TaskUpdate::from_task(&task).with_assignee(Some(Uuid::new_v4())))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let stored = app.services.tasks.get_task_by_id(task.id).await.unwrap();
    assert_eq!(stored, task);
}

#[tokio::test]
async fn deleted_task_hidden_from_listings_but_fetchable() {
    let app = TestApp::new();
    let carol = app.seed_user("Carol", "Smith", Role::User).await;
    let ctx = TestApp::ctx(&carol);
    let keep = app
        .services
        .tasks
        .save_task(&ctx, NewTask::new("Keep me", "stays"))
        .await
        .unwrap();
    let doomed = app
        .services
        .tasks
        .save_task(&ctx, NewTask::new("Drop me", "goes"))
        .await
        .unwrap();

    app.services.tasks.delete_task(&ctx, doomed.id).await.unwrap();
    app.services.tasks.delete_task(&ctx, doomed.id).await.unwrap();

    let listed = app.services.tasks.get_tasks(0, 50).await.unwrap();
    assert_eq!(listed.iter().map(|t| t.id).collect::<Vec<_>>(), vec![keep.id]);
    assert!(app
        .services
        .tasks
        .search(&TaskSearch::new("drop"))
        .await
        .unwrap()
        .is_empty());

    let fetched = app.services.tasks.get_task_by_id(doomed.id).await.unwrap();
    assert!(fetched.is_deleted);

    let deletions: Vec<_> = app
        .services
        .recent_changes
        .get_user_changes(carol.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|c| c.change_type == ChangeType::TaskDeletion)
        .collect();
    assert_eq!(deletions.len(), 1);
}

#[tokio::test]
async fn listing_fails_when_a_referenced_user_is_gone() {
    let app = TestApp::new();
    let carol = app.seed_user("Carol", "Smith", Role::User).await;
    let dave = app.seed_user("Dave", "Jones", Role::User).await;
    let ctx = TestApp::ctx(&carol);
    for i in 0..6 {
        let new_task = NewTask::new(format!("Task {}", i), "d");
        let new_task = if i == 3 { new_task.assigned_to(dave.id) } else { new_task };
        app.services.tasks.save_task(&ctx, new_task).await.unwrap();
    }

    app.users.remove(dave.id);

    let err = app.services.tasks.get_tasks(0, 50).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn listing_is_stable_and_newest_first() {
    let app = TestApp::new();
    let carol = app.seed_user("Carol", "Smith", Role::User).await;
    let ctx = TestApp::ctx(&carol);
    for i in 0..8 {
        app.services
            .tasks
            .save_task(&ctx, NewTask::new(format!("Task {}", i), "d"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let first = app.services.tasks.get_tasks(0, 50).await.unwrap();
    let second = app.services.tasks.get_tasks(0, 50).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first.iter().map(|t| t.number).collect::<Vec<_>>(),
        (1..=8).rev().collect::<Vec<u64>>()
    );

    let page = app.services.tasks.get_tasks(2, 3).await.unwrap();
    assert_eq!(page.iter().map(|t| t.number).collect::<Vec<_>>(), vec![6, 5, 4]);
}

#[tokio::test]
async fn search_matches_number_or_title() {
    let app = TestApp::new();
    let carol = app.seed_user("Carol", "Smith", Role::User).await;
    let dave = app.seed_user("Dave", "Jones", Role::User).await;
    let ctx = TestApp::ctx(&carol);
    let login = app
        .services
        .tasks
        .save_task(&ctx, NewTask::new("Fix login", "d").assigned_to(dave.id))
        .await
        .unwrap();
    app.services
        .tasks
        .save_task(&ctx, NewTask::new("Fix logout", "d"))
        .await
        .unwrap();

    let by_title = app.services.tasks.search(&TaskSearch::new("fix")).await.unwrap();
    assert_eq!(by_title.len(), 2);

    let by_number = app
        .services
        .tasks
        .search(&TaskSearch::new(login.number.to_string()))
        .await
        .unwrap();
    assert_eq!(by_number.iter().map(|t| t.id).collect::<Vec<_>>(), vec![login.id]);

    let for_dave = app
        .services
        .tasks
        .search_for_user(&TaskSearch::new("fix"), dave.id)
        .await
        .unwrap();
    assert_eq!(for_dave.len(), 1);
    assert_eq!(app.services.tasks.get_my_tasks(&TestApp::ctx(&dave)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn joins_work_inside_a_request_scope() {
    let app = TestApp::new();
    let carol = app.seed_user("Carol", "Smith", Role::User).await;
    let ctx = TestApp::ctx(&carol).with_request_id(RequestId::new("req-7"));
    for i in 0..4 {
        app.services
            .tasks
            .save_task(&ctx, NewTask::new(format!("Task {}", i), "d"))
            .await
            .unwrap();
    }

    let tasks = app.services.tasks.clone();
    let listed = scope_request_id(RequestId::new("req-7"), async move {
        tasks.get_tasks(0, 10).await
    })
    .await
    .unwrap();
    assert_eq!(listed.len(), 4);
}

#[tokio::test]
async fn task_refetch_is_stable() {
    let app = TestApp::new();
    let carol = app.seed_user("Carol", "Smith", Role::Admin).await;
    let dave = app.seed_user("Dave", "Jones", Role::User).await;
    let ctx = TestApp::ctx(&carol);
    let task = app
        .services
        .tasks
        .save_task(&ctx, NewTask::new("Audit access", "q3").assigned_to(dave.id))
        .await
        .unwrap();
    app.services
        .tasks
        .update(
            &TestApp::ctx(&dave),
            TaskUpdate::from_task(&task).with_status(TaskStatus::Done),
        )
        .await
        .unwrap();

    let first = app.services.tasks.get_task_by_id(task.id).await.unwrap();
    let second = app.services.tasks.get_task_by_id(task.id).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.updated_by.id, dave.id);
    assert_eq!(first.assigned.map(|u| u.id), Some(dave.id));
}
