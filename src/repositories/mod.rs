//! Storage seams of the engines.
//!
//! Tasks and users live in a document store, vacations and recent changes in a
//! relational store. Each trait has an in-memory implementation; the relational
//! ones also have a `sea-orm` implementation.

use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub mod recent_change_repository;
pub mod task_repository;
pub mod user_repository;
pub mod vacation_repository;

pub use recent_change_repository::{
    InMemoryRecentChangeRepository, RecentChangeRepository, SeaOrmRecentChangeRepository,
};
pub use task_repository::{InMemoryTaskRepository, TaskRepository};
pub use user_repository::{InMemoryUserRepository, UserRepository};
pub use vacation_repository::{
    InMemoryVacationRepository, SeaOrmVacationRepository, VacationRepository,
};

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}
