use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::households;

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable)]
#[diesel(table_name = households)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Household {
    pub id: Uuid,
    pub name: String,
    pub owner_user_id: Uuid,
    pub created_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = households)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewHousehold<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub owner_user_id: Uuid,
    pub created_timestamp: SystemTime,
}
