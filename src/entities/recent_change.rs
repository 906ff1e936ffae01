use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// What kind of mutation an audit record documents.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum ChangeType {
    #[sea_orm(string_value = "Assignment")]
    Assignment,
    #[sea_orm(string_value = "TaskStatusChange")]
    TaskStatusChange,
    #[sea_orm(string_value = "TaskDeletion")]
    TaskDeletion,
    #[sea_orm(string_value = "VacationStatusChange")]
    VacationStatusChange,
    #[sea_orm(string_value = "VacationRequest")]
    VacationRequest,
}

/// The `recent_changes` table. Rows are append-only.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recent_changes")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Denormalized label, e.g. `"12 Fix bug"` or `"3 Vacation"`.
    pub title: String,
    /// Task or vacation the change happened to.
    pub incident_id: Uuid,
    pub change_type: ChangeType,
    /// Subject of the change.
    pub user_name: String,
    #[sea_orm(indexed)]
    pub user_id: Uuid,
    /// Creator or owner of the underlying task/vacation.
    #[sea_orm(indexed)]
    pub owner_id: Uuid,
    /// Actor; absent for self-service changes such as a vacation request.
    pub updated_by_name: Option<String>,
    pub updated_by_id: Option<Uuid>,
    pub change_time: DateTime<Utc>,
    /// Status snapshot at the time of the change.
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// True when `user_id` is either the subject or the owner of this change.
    pub fn concerns(&self, user_id: Uuid) -> bool {
        self.user_id == user_id || self.owner_id == user_id
    }
}
