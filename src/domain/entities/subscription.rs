use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Tier, UserId};

/// Billing state for a user. Written by the billing side, read here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: UserId,
    pub has_active_membership: bool,
}

impl Subscription {
    pub fn new(user_id: UserId, has_active_membership: bool) -> Self {
        Self {
            user_id,
            has_active_membership,
        }
    }

    pub fn tier(&self) -> Tier {
        Tier::from_membership(self.has_active_membership)
    }
}
