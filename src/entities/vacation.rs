use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Lifecycle of a vacation request.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum VacationStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Approved")]
    Approved,
    #[sea_orm(string_value = "Rejected")]
    Rejected,
    #[sea_orm(string_value = "Canceled")]
    Canceled,
    #[sea_orm(string_value = "Expired")]
    Expired,
}

impl VacationStatus {
    /// Pending, approved and rejected requests are "actual"; canceled and
    /// expired ones are history.
    pub fn is_actual(self) -> bool {
        matches!(
            self,
            VacationStatus::Pending | VacationStatus::Approved | VacationStatus::Rejected
        )
    }
}

/// The `vacations` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vacations")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Sequential human-readable number, unique across all vacations.
    #[sea_orm(unique)]
    pub number: i64,
    #[sea_orm(indexed)]
    pub user_id: Uuid,
    /// Owner's name at request time.
    pub user_full_name: String,
    /// First day off, inclusive.
    pub start_date: NaiveDate,
    /// Last day off, inclusive.
    pub end_date: NaiveDate,
    pub status: VacationStatus,
    pub status_changer_id: Option<Uuid>,
    pub status_changer_full_name: Option<String>,
    pub update_time: DateTime<Utc>,
    pub was_approved: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Closed `[start_date, end_date]` range of the request.
    pub fn range(&self) -> (NaiveDate, NaiveDate) {
        (self.start_date, self.end_date)
    }
}
