//! Staff Manager
//!
//! Core of a staff-management backend: task tracking with sequential numbers,
//! vacation requests reviewed by admins, and a per-user trail of recent changes.
//! Tasks and users live in a document store, vacations and the audit trail in a
//! relational database reached through `sea-orm`.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod models;
pub mod repositories;
pub mod services;
pub mod tracing;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::ServiceResult;
use crate::repositories::{
    InMemoryRecentChangeRepository, InMemoryTaskRepository, InMemoryUserRepository,
    InMemoryVacationRepository, RecentChangeRepository, SeaOrmRecentChangeRepository,
    SeaOrmVacationRepository, TaskRepository, UserRepository, VacationRepository,
};
use crate::services::{RecentChangeService, TaskService, UserService, VacationService};

/// Storage backends the engines run on.
#[derive(Clone)]
pub struct Repositories {
    pub tasks: Arc<dyn TaskRepository>,
    pub users: Arc<dyn UserRepository>,
    pub vacations: Arc<dyn VacationRepository>,
    pub recent_changes: Arc<dyn RecentChangeRepository>,
}

impl Repositories {
    /// Everything kept in process memory.
    pub fn in_memory() -> Self {
        Self {
            tasks: Arc::new(InMemoryTaskRepository::new()),
            users: Arc::new(InMemoryUserRepository::new()),
            vacations: Arc::new(InMemoryVacationRepository::new()),
            recent_changes: Arc::new(InMemoryRecentChangeRepository::new()),
        }
    }
}

/// The engines, wired to shared repositories.
#[derive(Clone)]
pub struct StaffServices {
    pub users: UserService,
    pub tasks: TaskService,
    pub vacations: VacationService,
    pub recent_changes: RecentChangeService,
}

impl StaffServices {
    pub fn new(repos: Repositories, config: &AppConfig) -> Self {
        let users = UserService::new(repos.users);
        let recent_changes = RecentChangeService::new(repos.recent_changes);
        let tasks = TaskService::new(repos.tasks, users.clone(), recent_changes.clone())
            .with_join_workers(config.task_join_workers)
            .with_default_page_size(config.default_page_size);
        let vacations = VacationService::new(repos.vacations, users.clone(), recent_changes.clone());

        Self {
            users,
            tasks,
            vacations,
            recent_changes,
        }
    }

    pub fn in_memory(config: &AppConfig) -> Self {
        Self::new(Repositories::in_memory(), config)
    }

    /// Connects the relational repositories to `config.database_url`, creating
    /// the tables when `auto_create_schema` is set. Tasks and users stay on the
    /// in-memory document store.
    pub async fn connect(config: &AppConfig) -> ServiceResult<Self> {
        let pool = Arc::new(db::establish_connection_from_app_config(config).await?);
        if config.auto_create_schema {
            db::create_schema(&pool).await?;
        }
        ::tracing::info!(environment = %config.environment, "Staff services connected");

        let repos = Repositories {
            vacations: Arc::new(SeaOrmVacationRepository::new(pool.clone())),
            recent_changes: Arc::new(SeaOrmRecentChangeRepository::new(pool)),
            ..Repositories::in_memory()
        };
        Ok(Self::new(repos, config))
    }
}
