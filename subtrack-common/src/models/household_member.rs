use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{Associations, Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::household::Household;
use crate::schema::household_members;

#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum HouseholdRole {
    Owner,
    Member,
}

impl HouseholdRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            HouseholdRole::Owner => "owner",
            HouseholdRole::Member => "member",
        }
    }
}

impl std::fmt::Display for HouseholdRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql<Text, Pg> for HouseholdRole {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        <str as ToSql<Text, Pg>>::to_sql(self.as_str(), out)
    }
}

impl FromSql<Text, Pg> for HouseholdRole {
    fn from_sql(value: PgValue) -> deserialize::Result<Self> {
        match std::str::from_utf8(value.as_bytes())? {
            "owner" => Ok(HouseholdRole::Owner),
            "member" => Ok(HouseholdRole::Member),
            other => Err(format!("Unrecognized household role: {other}").into()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Associations, Identifiable, Queryable)]
#[diesel(belongs_to(Household, foreign_key = household_id))]
#[diesel(table_name = household_members)]
#[diesel(primary_key(user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct HouseholdMember {
    pub user_id: Uuid,
    pub household_id: Uuid,
    pub role: HouseholdRole,
    pub joined_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = household_members)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewHouseholdMember {
    pub user_id: Uuid,
    pub household_id: Uuid,
    pub role: HouseholdRole,
    pub joined_timestamp: SystemTime,
}
