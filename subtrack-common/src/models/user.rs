use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::users;

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub auth_string_hash: String,
    pub display_currency: String,
    pub household_id: Option<Uuid>,
    pub email_reminders_enabled: bool,
    pub created_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewUser<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub auth_string_hash: &'a str,
    pub display_currency: &'a str,
    pub household_id: Option<Uuid>,
    pub email_reminders_enabled: bool,
    pub created_timestamp: SystemTime,
}
