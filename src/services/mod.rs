//! Workflow engines and the pieces they share.

pub mod overlap;
pub mod recent_changes;
pub mod tasks;
pub mod users;
pub mod vacations;

pub use recent_changes::RecentChangeService;
pub use tasks::TaskService;
pub use users::UserService;
pub use vacations::VacationService;
