use diesel::{Associations, Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::subscription::Subscription;
use crate::schema::subscription_history;

#[derive(Clone, Debug, Serialize, Deserialize, Associations, Identifiable, Queryable)]
#[diesel(belongs_to(Subscription, foreign_key = subscription_id))]
#[diesel(table_name = subscription_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SubscriptionHistoryEntry {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub user_id: Uuid,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = subscription_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewSubscriptionHistoryEntry<'a> {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub user_id: Uuid,
    pub field: &'a str,
    pub old_value: Option<&'a str>,
    pub new_value: Option<&'a str>,
    pub changed_timestamp: SystemTime,
}
