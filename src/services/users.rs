use metrics::counter;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::errors::{ResultExt, ServiceError, ServiceResult};
use crate::models::{User, UserSearch};
use crate::repositories::UserRepository;

/// User lookups shared by the task and vacation engines.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self))]
    pub async fn get_user_by_id(&self, id: Uuid) -> ServiceResult<User> {
        self.repo.get_user_by_id(id).await.context("loading user")
    }

    /// Loads the user playing `role` in a request (creator, assignee, ...).
    /// A missing user is reported as `NotFound` naming that role.
    pub async fn resolve(&self, id: Uuid, role: &str) -> ServiceResult<User> {
        match self.get_user_by_id(id).await {
            Err(ServiceError::NotFound(_)) => {
                warn!(user_id = %id, role = role, "Referenced user does not exist");
                counter!("staff_manager.users.unresolved", 1, "role" => role.to_string());
                Err(ServiceError::not_found(format!(
                    "{} user with id = {} is not found",
                    role, id
                )))
            }
            other => other,
        }
    }

    #[instrument(skip(self))]
    pub async fn search_users(&self, criteria: &UserSearch) -> ServiceResult<Vec<User>> {
        let users = self
            .repo
            .search_users(criteria)
            .await
            .context("searching users")?;
        debug!(found = users.len(), "User search finished");
        Ok(users)
    }

    #[instrument(skip(self))]
    pub async fn get_admins(&self) -> ServiceResult<Vec<User>> {
        self.repo.get_admins().await.context("loading admins")
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn save(&self, user: User) -> ServiceResult<()> {
        self.repo.save(user).await.context("saving user")
    }
}
