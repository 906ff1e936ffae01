use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

use super::user::User;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum TaskStatus {
    #[default]
    Ready,
    InProgress,
    Done,
    Blocked,
}

/// A task as stored in the `tasks` document index: users are referenced by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDocument {
    pub id: Uuid,
    pub number: u64,
    pub title: String,
    pub description: String,
    pub created_by_id: Uuid,
    pub updated_by_id: Uuid,
    #[serde(rename = "assignedID", default)]
    pub assigned_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: TaskStatus,
    #[serde(default)]
    pub is_deleted: bool,
}

impl TaskDocument {
    /// Label used in audit records, e.g. `"12 Fix bug"`.
    pub fn label(&self) -> String {
        format!("{} {}", self.number, self.title)
    }
}

/// A task joined with the users it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub number: u64,
    pub title: String,
    pub description: String,
    pub created_by: User,
    pub updated_by: User,
    pub assigned: Option<User>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_deleted: bool,
}

impl Task {
    pub fn from_document(
        doc: TaskDocument,
        created_by: User,
        updated_by: User,
        assigned: Option<User>,
    ) -> Self {
        Self {
            id: doc.id,
            number: doc.number,
            title: doc.title,
            description: doc.description,
            created_by,
            updated_by,
            assigned,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            status: doc.status,
            is_deleted: doc.is_deleted,
        }
    }
}

/// Payload for creating a task. Status always starts at `Ready`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "description must not be empty"))]
    pub description: String,
    #[serde(rename = "assignedID", default)]
    pub assigned_id: Option<Uuid>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            assigned_id: None,
        }
    }

    pub fn assigned_to(mut self, user_id: Uuid) -> Self {
        self.assigned_id = Some(user_id);
        self
    }
}

/// Full replacement of a task's mutable fields.
///
/// `number`, `created_by_id` and `created_at` may be supplied by callers but are
/// always overwritten from the stored task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub id: Uuid,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "description must not be empty"))]
    pub description: String,
    #[serde(rename = "assignedID", default)]
    pub assigned_id: Option<Uuid>,
    pub status: TaskStatus,
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub created_by_id: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl TaskUpdate {
    /// Starts an update that keeps every mutable field of `task` as is.
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            assigned_id: task.assigned.as_ref().map(|u| u.id),
            status: task.status,
            number: None,
            created_by_id: None,
            created_at: None,
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_assignee(mut self, assigned_id: Option<Uuid>) -> Self {
        self.assigned_id = assigned_id;
        self
    }
}

/// Title/number query for task search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSearch {
    pub search: String,
}

impl TaskSearch {
    pub fn new(search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
        }
    }

    /// Numeric queries match the task number exactly; anything else is a
    /// case-insensitive substring match on the title.
    pub fn matches(&self, task: &TaskDocument) -> bool {
        let query = self.search.trim();
        if query.is_empty() {
            return true;
        }
        if let Ok(number) = query.parse::<u64>() {
            return task.number == number;
        }
        task.title.to_lowercase().contains(&query.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(number: u64, title: &str) -> TaskDocument {
        let now = Utc::now();
        let author = Uuid::new_v4();
        TaskDocument {
            id: Uuid::new_v4(),
            number,
            title: title.into(),
            description: "d".into(),
            created_by_id: author,
            updated_by_id: author,
            assigned_id: None,
            created_at: now,
            updated_at: now,
            status: TaskStatus::Ready,
            is_deleted: false,
        }
    }

    #[test]
    fn empty_title_fails_validation() {
        assert!(NewTask::new("", "desc").validate().is_err());
        assert!(NewTask::new("title", "").validate().is_err());
        assert!(NewTask::new("title", "desc").validate().is_ok());
    }

    #[test]
    fn search_by_number_or_title() {
        let task = document(12, "Fix login bug");
        assert!(TaskSearch::new("12").matches(&task));
        assert!(!TaskSearch::new("1").matches(&task));
        assert!(TaskSearch::new("LOGIN").matches(&task));
        assert!(!TaskSearch::new("logout").matches(&task));
    }

    #[test]
    fn document_uses_wire_field_names() {
        let mut doc = document(3, "t");
        doc.assigned_id = Some(Uuid::nil());
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("assignedID").is_some());
        assert!(json.get("updatedAt").is_some());
        assert_eq!(json["status"], "Ready");
    }

    #[test]
    fn label_prefixes_number() {
        assert_eq!(document(7, "Fix bug").label(), "7 Fix bug");
    }
}
