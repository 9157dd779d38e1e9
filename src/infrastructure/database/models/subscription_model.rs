use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::entities::Subscription;
use crate::domain::value_objects::UserId;
use crate::infrastructure::database::schema::user_subscriptions;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = user_subscriptions)]
#[diesel(primary_key(user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SubscriptionModel {
    pub user_id: String,
    pub has_active_membership: bool,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionModel> for Subscription {
    type Error = String;

    fn try_from(model: SubscriptionModel) -> Result<Self, Self::Error> {
        Ok(Subscription::new(
            UserId::new(model.user_id)?,
            model.has_active_membership,
        ))
    }
}
