//! Document-store records, joined views and request inputs.

pub mod context;
pub mod task;
pub mod user;
pub mod vacation;

pub use context::RequestContext;
pub use task::{NewTask, Task, TaskDocument, TaskSearch, TaskStatus, TaskUpdate};
pub use user::{Role, User, UserSearch};
pub use vacation::{NewVacation, Vacation};
