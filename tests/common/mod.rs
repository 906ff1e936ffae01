#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use staff_manager::config::AppConfig;
use staff_manager::models::{RequestContext, Role, User};
use staff_manager::repositories::{
    InMemoryRecentChangeRepository, InMemoryTaskRepository, InMemoryUserRepository,
    InMemoryVacationRepository,
};
use staff_manager::{Repositories, StaffServices};
use uuid::Uuid;

/// Engines over in-memory stores, with handles on the stores for assertions.
pub struct TestApp {
    pub services: StaffServices,
    pub users: Arc<InMemoryUserRepository>,
    pub tasks: Arc<InMemoryTaskRepository>,
    pub vacations: Arc<InMemoryVacationRepository>,
    pub recent_changes: Arc<InMemoryRecentChangeRepository>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(&AppConfig::default())
    }

    pub fn with_config(config: &AppConfig) -> Self {
        let users = Arc::new(InMemoryUserRepository::new());
        let tasks = Arc::new(InMemoryTaskRepository::new());
        let vacations = Arc::new(InMemoryVacationRepository::new());
        let recent_changes = Arc::new(InMemoryRecentChangeRepository::new());

        let repos = Repositories {
            tasks: tasks.clone(),
            users: users.clone(),
            vacations: vacations.clone(),
            recent_changes: recent_changes.clone(),
        };

        Self {
            services: StaffServices::new(repos, config),
            users,
            tasks,
            vacations,
            recent_changes,
        }
    }

    /// Stores a new user and returns it.
    pub async fn seed_user(&self, first: &str, last: &str, role: Role) -> User {
        let user = User {
            id: Uuid::new_v4(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            position: "Engineer".to_string(),
            role,
            email: format!("{}.{}@example.com", first, last).to_lowercase(),
            mobile_phone: None,
            date_of_birth: None,
        };
        self.services
            .users
            .save(user.clone())
            .await
            .expect("failed to seed user");
        user
    }

    pub fn ctx(user: &User) -> RequestContext {
        RequestContext::new(user.id, user.role)
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}
