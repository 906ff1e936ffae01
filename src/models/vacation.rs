use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::User;
use crate::entities::vacation::{Model as VacationRecord, VacationStatus};

/// A vacation joined with its owner and, once reviewed, the status changer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vacation {
    pub id: Uuid,
    pub number: i64,
    pub user: User,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: VacationStatus,
    pub update_time: DateTime<Utc>,
    pub status_changer: Option<User>,
    pub was_approved: bool,
}

impl Vacation {
    pub fn from_record(record: VacationRecord, user: User, status_changer: Option<User>) -> Self {
        Self {
            id: record.id,
            number: record.number,
            user,
            start_date: record.start_date,
            end_date: record.end_date,
            status: record.status,
            update_time: record.update_time,
            status_changer,
            was_approved: record.was_approved,
        }
    }
}

/// A vacation request as submitted by its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVacation {
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl NewVacation {
    pub fn new(user_id: Uuid, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            user_id,
            start_date,
            end_date,
        }
    }

    pub fn range(&self) -> (NaiveDate, NaiveDate) {
        (self.start_date, self.end_date)
    }
}
