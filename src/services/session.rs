use crate::models::UserId;

/// Who is acting, passed explicitly into every workflow entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: UserId,
    /// Bearer token forwarded to the remote activity service. Unused by the local store.
    pub access_token: Option<String>,
}

impl SessionContext {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            access_token: None,
        }
    }

    pub fn with_token(user_id: UserId, access_token: impl Into<String>) -> Self {
        Self {
            user_id,
            access_token: Some(access_token.into()),
        }
    }
}
