use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Role;
use crate::tracing::{request_id_field, RequestId};

/// Authenticated actor of the current request, supplied by the web layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub role: Role,
    #[serde(skip)]
    pub request_id: Option<RequestId>,
}

impl RequestContext {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self {
            user_id,
            role,
            request_id: None,
        }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn user(user_id: Uuid) -> Self {
        Self::new(user_id, Role::User)
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Request id for log fields, falling back to the enclosing request scope.
    pub fn log_request_id(&self) -> String {
        match &self.request_id {
            Some(id) => id.to_string(),
            None => request_id_field(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracing::scope_request_id;

    #[tokio::test]
    async fn log_request_id_prefers_own_id() {
        let ctx = RequestContext::user(Uuid::new_v4()).with_request_id(RequestId::new("ctx-1"));
        let seen = scope_request_id(RequestId::new("scope-1"), async { ctx.log_request_id() }).await;
        assert_eq!(seen, "ctx-1");

        let bare = RequestContext::admin(Uuid::new_v4());
        let seen = scope_request_id(RequestId::new("scope-2"), async { bare.log_request_id() }).await;
        assert_eq!(seen, "scope-2");
        assert!(bare.is_admin());
    }
}
