use chrono::Utc;
use metrics::counter;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::overlap::find_overlap;
use super::recent_changes::{self, RecentChangeService};
use super::users::UserService;
use crate::entities::vacation::{Model as VacationRecord, VacationStatus};
use crate::errors::{ResultExt, ServiceError, ServiceResult};
use crate::models::{NewVacation, RequestContext, User, Vacation};
use crate::repositories::VacationRepository;
use crate::tracing::request_id_field;

/// Vacation workflow: overlap-checked requests, review by admins and
/// listings joined with the owning users.
#[derive(Clone)]
pub struct VacationService {
    vacations: Arc<dyn VacationRepository>,
    users: UserService,
    recent_changes: RecentChangeService,
}

impl VacationService {
    pub fn new(
        vacations: Arc<dyn VacationRepository>,
        users: UserService,
        recent_changes: RecentChangeService,
    ) -> Self {
        Self {
            vacations,
            users,
            recent_changes,
        }
    }

    /// Files a new `Pending` request.
    ///
    /// Fails with `InvalidData` when the range overlaps one of the user's
    /// pending requests; nothing is written in that case.
    #[instrument(skip(self, request), fields(request_id = %request_id_field(), user_id = %request.user_id, start = %request.start_date, end = %request.end_date))]
    pub async fn save(&self, request: NewVacation) -> ServiceResult<Vacation> {
        if request.start_date > request.end_date {
            return Err(ServiceError::ValidationError(format!(
                "vacation start date {} is after end date {}",
                request.start_date, request.end_date
            )));
        }

        let pending = self
            .vacations
            .get_pending_for_user(request.user_id)
            .await
            .context("loading pending vacations")?;
        if let Some(conflict) = find_overlap(&pending, request.range(), VacationRecord::range) {
            warn!(conflict_id = %conflict.id, "Vacation request overlaps a pending one");
            counter!("staff_manager.vacations.conflicts", 1);
            return Err(ServiceError::InvalidData(format!(
                "cannot create vacation with start date = {}, reason: intersection with actual vacation with id = {} ends at {}",
                request.start_date, conflict.id, conflict.end_date
            )));
        }

        let owner = self.users.resolve(request.user_id, "vacation owner").await?;
        let record = VacationRecord {
            id: Uuid::new_v4(),
            number: 0,
            user_id: owner.id,
            user_full_name: owner.full_name(),
            start_date: request.start_date,
            end_date: request.end_date,
            status: VacationStatus::Pending,
            status_changer_id: None,
            status_changer_full_name: None,
            update_time: Utc::now(),
            was_approved: false,
        };

        let stored = match self.vacations.save(record).await {
            Ok(stored) => stored,
            Err(e) => {
                error!(error = %e, "Failed to save vacation");
                return Err(e).context("saving vacation");
            }
        };
        counter!("staff_manager.vacations.requested", 1);
        info!(vacation_id = %stored.id, number = stored.number, "Vacation requested");

        self.recent_changes
            .record(recent_changes::vacation_request(&stored, &owner))
            .await?;

        Ok(Vacation::from_record(stored, owner, None))
    }

    /// Sets a new status on behalf of the caller.
    ///
    /// `was_approved` mirrors whether the new status is `Approved`.
    #[instrument(skip(self, ctx), fields(request_id = %ctx.log_request_id(), user_id = %ctx.user_id))]
    pub async fn update_vacation_status(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        status: VacationStatus,
    ) -> ServiceResult<Vacation> {
        let stored = self
            .vacations
            .get_by_id(id)
            .await
            .context("loading vacation")?;
        let owner = self.users.resolve(stored.user_id, "vacation owner").await?;
        let changer = self.users.resolve(ctx.user_id, "status changer").await?;

        let old_status = stored.status;
        let updated = VacationRecord {
            status,
            was_approved: status == VacationStatus::Approved,
            status_changer_id: Some(changer.id),
            status_changer_full_name: Some(changer.full_name()),
            update_time: Utc::now(),
            ..stored
        };

        self.vacations
            .update(updated.clone())
            .await
            .context("updating vacation status")?;
        info!(vacation_id = %id, old_status = %old_status, new_status = %status, "Vacation status updated");

        self.recent_changes
            .record(recent_changes::vacation_status_change(&updated, &owner, &changer))
            .await?;

        Ok(Vacation::from_record(updated, owner, Some(changer)))
    }

    /// Pending, approved and rejected vacations of everybody.
    #[instrument(skip(self))]
    pub async fn get_all(&self) -> ServiceResult<Vec<Vacation>> {
        let records = self.vacations.get_all().await.context("loading vacations")?;
        self.join_vacations(records).await
    }

    #[instrument(skip(self))]
    pub async fn get_pending(&self) -> ServiceResult<Vec<Vacation>> {
        let records = self
            .vacations
            .get_pending()
            .await
            .context("loading pending vacations")?;
        self.join_vacations(records).await
    }

    #[instrument(skip(self))]
    pub async fn get_for_user(&self, user_id: Uuid) -> ServiceResult<Vec<Vacation>> {
        let records = self
            .vacations
            .get_for_user(user_id)
            .await
            .context("loading user vacations")?;
        self.join_vacations(records).await
    }

    /// Unlike the listings, a vacation fetched by id fails when its owner or
    /// status changer cannot be resolved.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: Uuid) -> ServiceResult<Vacation> {
        let record = self
            .vacations
            .get_by_id(id)
            .await
            .context("loading vacation")?;
        let owner = self.users.resolve(record.user_id, "vacation owner").await?;
        let changer = match record.status_changer_id {
            Some(changer_id) => Some(self.users.resolve(changer_id, "status changer").await?),
            None => None,
        };
        Ok(Vacation::from_record(record, owner, changer))
    }

    /// Joins records with their owners and status changers, looking each
    /// distinct user up once. Records referencing a user that no longer exists
    /// are skipped.
    async fn join_vacations(&self, records: Vec<VacationRecord>) -> ServiceResult<Vec<Vacation>> {
        let mut users: HashMap<Uuid, Option<User>> = HashMap::new();
        let mut joined = Vec::with_capacity(records.len());

        for record in records {
            let owner = self.memoized_user(&mut users, record.user_id).await?;
            let changer = match record.status_changer_id {
                Some(changer_id) => Some(self.memoized_user(&mut users, changer_id).await?),
                None => None,
            };

            match (owner, changer) {
                (Some(owner), None) => joined.push(Vacation::from_record(record, owner, None)),
                (Some(owner), Some(Some(changer))) => {
                    joined.push(Vacation::from_record(record, owner, Some(changer)))
                }
                (None, _) | (_, Some(None)) => {
                    warn!(
                        vacation_id = %record.id,
                        user_id = %record.user_id,
                        status_changer_id = ?record.status_changer_id,
                        "Skipping vacation referencing an unknown user"
                    );
                    counter!("staff_manager.vacations.join_skipped", 1);
                }
            }
        }

        Ok(joined)
    }

    /// `None` when the user does not exist; other lookup failures propagate.
    async fn memoized_user(
        &self,
        users: &mut HashMap<Uuid, Option<User>>,
        id: Uuid,
    ) -> ServiceResult<Option<User>> {
        if let Some(known) = users.get(&id) {
            return Ok(known.clone());
        }
        let user = match self.users.get_user_by_id(id).await {
            Ok(user) => Some(user),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        users.insert(id, user.clone());
        Ok(user)
    }
}
