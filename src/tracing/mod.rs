//! Request-scoped transaction ids.
//!
//! The web layer opens a scope per inbound request; everything the engines log
//! while serving it can then be correlated through [`current_request_id`].
//! Task-locals do not cross `tokio::spawn`, so code that fans work out to spawned
//! tasks has to capture the id and re-enter the scope with [`scope_request_id`].

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use uuid::Uuid;

/// Request ID tracking information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl Default for RequestId {
    fn default() -> Self {
        RequestId(Uuid::new_v4().to_string())
    }
}

impl RequestId {
    pub fn new(value: impl Into<String>) -> Self {
        RequestId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

tokio::task_local! {
    static CURRENT_REQUEST_ID: RefCell<Option<RequestId>>;
}

pub async fn scope_request_id<Fut, R>(request_id: RequestId, future: Fut) -> R
where
    Fut: Future<Output = R>,
{
    CURRENT_REQUEST_ID
        .scope(RefCell::new(Some(request_id)), future)
        .await
}

/// Runs `future` inside the scope of `request_id` when one is given.
pub async fn scope_optional_request_id<Fut, R>(request_id: Option<RequestId>, future: Fut) -> R
where
    Fut: Future<Output = R>,
{
    match request_id {
        Some(id) => scope_request_id(id, future).await,
        None => future.await,
    }
}

pub fn current_request_id() -> Option<RequestId> {
    CURRENT_REQUEST_ID
        .try_with(|cell| cell.borrow().clone())
        .ok()
        .flatten()
}

/// Request id rendered for log fields; `-` outside of a request scope.
pub fn request_id_field() -> String {
    current_request_id()
        .map(|rid| rid.0)
        .unwrap_or_else(|| "-".to_string())
}
