use crate::domain::value_objects::UserId;

/// What the identity provider tells us about the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identity {
    user_id: Option<UserId>,
}

impl Identity {
    pub fn signed_in(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.user_id.is_some()
    }
}

impl From<Option<UserId>> for Identity {
    fn from(user_id: Option<UserId>) -> Self {
        Self { user_id }
    }
}
