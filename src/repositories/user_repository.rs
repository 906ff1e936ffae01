use async_trait::async_trait;
use dashmap::DashMap;
#[cfg(test)]
use mockall::automock;
use uuid::Uuid;

use crate::errors::{ServiceError, ServiceResult};
use crate::models::{Role, User, UserSearch};

/// Name of the document index holding staff members.
pub const STAFF_INDEX: &str = "staff";

#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `NotFound` when no user has this id.
    async fn get_user_by_id(&self, id: Uuid) -> ServiceResult<User>;
    async fn search_users(&self, criteria: &UserSearch) -> ServiceResult<Vec<User>>;
    async fn get_admins(&self) -> ServiceResult<Vec<User>>;
    /// Creates or replaces a user document.
    async fn save(&self, user: User) -> ServiceResult<()>;
}

/// Document-store stand-in for the `staff` index.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: DashMap<Uuid, User>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let repo = Self::new();
        for user in users {
            repo.users.insert(user.id, user);
        }
        repo
    }

    /// Removes a user; later lookups of the id fail with `NotFound`.
    pub fn remove(&self, id: Uuid) -> Option<User> {
        self.users.remove(&id).map(|(_, user)| user)
    }

    fn sorted(mut users: Vec<User>) -> Vec<User> {
        users.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str())
                .cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });
        users
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get_user_by_id(&self, id: Uuid) -> ServiceResult<User> {
        self.users
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ServiceError::not_found(format!("{}/{} not found", STAFF_INDEX, id)))
    }

    async fn search_users(&self, criteria: &UserSearch) -> ServiceResult<Vec<User>> {
        let found = self
            .users
            .iter()
            .filter(|entry| criteria.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        Ok(Self::sorted(found))
    }

    async fn get_admins(&self) -> ServiceResult<Vec<User>> {
        let admins = self
            .users
            .iter()
            .filter(|entry| entry.value().role == Role::Admin)
            .map(|entry| entry.value().clone())
            .collect();
        Ok(Self::sorted(admins))
    }

    async fn save(&self, user: User) -> ServiceResult<()> {
        self.users.insert(user.id, user);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str, role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            first_name: first.into(),
            last_name: last.into(),
            position: "Engineer".into(),
            role,
            email: format!("{}@example.com", first.to_lowercase()),
            mobile_phone: None,
            date_of_birth: None,
        }
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let repo = InMemoryUserRepository::new();
        let err = repo.get_user_by_id(Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn admins_are_filtered_by_role() {
        let admin = user("Grace", "Hopper", Role::Admin);
        let repo = InMemoryUserRepository::with_users([admin.clone(), user("Ada", "Lovelace", Role::User)]);
        assert_eq!(repo.get_admins().await.unwrap(), vec![admin]);
    }

    #[tokio::test]
    async fn search_results_sorted_by_last_name() {
        let repo = InMemoryUserRepository::with_users([
            user("Alan", "Turing", Role::User),
            user("Alan", "Kay", Role::User),
        ]);
        let found = repo.search_users(&UserSearch::by_name("alan")).await.unwrap();
        let names: Vec<_> = found.iter().map(User::full_name).collect();
        assert_eq!(names, ["Alan Kay", "Alan Turing"]);
    }
}
