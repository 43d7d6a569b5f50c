use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::subscriptions;

#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Annual,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Annual => "annual",
        }
    }
}

impl std::fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql<Text, Pg> for BillingCycle {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        <str as ToSql<Text, Pg>>::to_sql(self.as_str(), out)
    }
}

impl FromSql<Text, Pg> for BillingCycle {
    fn from_sql(value: PgValue) -> deserialize::Result<Self> {
        match std::str::from_utf8(value.as_bytes())? {
            "monthly" => Ok(BillingCycle::Monthly),
            "annual" => Ok(BillingCycle::Annual),
            other => Err(format!("Unrecognized billing cycle: {other}").into()),
        }
    }
}

#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Trial,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Trial => "trial",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql<Text, Pg> for SubscriptionStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        <str as ToSql<Text, Pg>>::to_sql(self.as_str(), out)
    }
}

impl FromSql<Text, Pg> for SubscriptionStatus {
    fn from_sql(value: PgValue) -> deserialize::Result<Self> {
        match std::str::from_utf8(value.as_bytes())? {
            "active" => Ok(SubscriptionStatus::Active),
            "paused" => Ok(SubscriptionStatus::Paused),
            "trial" => Ok(SubscriptionStatus::Trial),
            other => Err(format!("Unrecognized subscription status: {other}").into()),
        }
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    Deserialize,
    AsExpression,
    FromSqlRow,
)]
#[diesel(sql_type = Text)]
pub enum Category {
    #[serde(rename = "Streaming")]
    Streaming,
    #[serde(rename = "Music")]
    Music,
    #[serde(rename = "Gaming")]
    Gaming,
    #[serde(rename = "News & Media")]
    NewsMedia,
    #[serde(rename = "Fitness")]
    Fitness,
    #[serde(rename = "Food")]
    Food,
    #[serde(rename = "Software")]
    Software,
    #[serde(rename = "Cloud Storage")]
    CloudStorage,
    #[serde(rename = "Education")]
    Education,
    #[serde(rename = "VPN & Security")]
    VpnSecurity,
    #[serde(rename = "Productivity")]
    Productivity,
    #[serde(rename = "Shopping")]
    Shopping,
    #[serde(rename = "Other")]
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Streaming => "Streaming",
            Category::Music => "Music",
            Category::Gaming => "Gaming",
            Category::NewsMedia => "News & Media",
            Category::Fitness => "Fitness",
            Category::Food => "Food",
            Category::Software => "Software",
            Category::CloudStorage => "Cloud Storage",
            Category::Education => "Education",
            Category::VpnSecurity => "VPN & Security",
            Category::Productivity => "Productivity",
            Category::Shopping => "Shopping",
            Category::Other => "Other",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Streaming" => Some(Category::Streaming),
            "Music" => Some(Category::Music),
            "Gaming" => Some(Category::Gaming),
            "News & Media" => Some(Category::NewsMedia),
            "Fitness" => Some(Category::Fitness),
            "Food" => Some(Category::Food),
            "Software" => Some(Category::Software),
            "Cloud Storage" => Some(Category::CloudStorage),
            "Education" => Some(Category::Education),
            "VPN & Security" => Some(Category::VpnSecurity),
            "Productivity" => Some(Category::Productivity),
            "Shopping" => Some(Category::Shopping),
            "Other" => Some(Category::Other),
            _ => None,
        }
    }

    // Import candidates arrive with free-form category labels. Unrecognized
    // labels land in Other rather than failing the import.
    pub fn from_name_lenient(name: &str) -> Self {
        if let Some(category) = Self::from_name(name) {
            return category;
        }

        match name {
            "News" | "Media" => Category::NewsMedia,
            "Cloud" => Category::CloudStorage,
            "VPN" | "Security" => Category::VpnSecurity,
            _ => Category::Other,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql<Text, Pg> for Category {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        <str as ToSql<Text, Pg>>::to_sql(self.as_str(), out)
    }
}

impl FromSql<Text, Pg> for Category {
    fn from_sql(value: PgValue) -> deserialize::Result<Self> {
        let name = std::str::from_utf8(value.as_bytes())?;
        Category::from_name(name).ok_or_else(|| format!("Unrecognized category: {name}").into())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable)]
#[diesel(table_name = subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub household_id: Option<Uuid>,
    pub name: String,
    pub category: Category,
    pub amount_cents: i64,
    pub currency: String,
    pub billing_cycle: BillingCycle,
    pub status: SubscriptionStatus,
    pub renewal_timestamp: SystemTime,
    pub trial_end_timestamp: Option<SystemTime>,
    pub notes: Option<String>,
    pub created_timestamp: SystemTime,
    pub modified_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewSubscription<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub household_id: Option<Uuid>,
    pub name: &'a str,
    pub category: Category,
    pub amount_cents: i64,
    pub currency: &'a str,
    pub billing_cycle: BillingCycle,
    pub status: SubscriptionStatus,
    pub renewal_timestamp: SystemTime,
    pub trial_end_timestamp: Option<SystemTime>,
    pub notes: Option<&'a str>,
    pub created_timestamp: SystemTime,
    pub modified_timestamp: SystemTime,
}
