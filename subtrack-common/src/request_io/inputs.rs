use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::subscription::{BillingCycle, Category, SubscriptionStatus};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputUser {
    pub email: String,
    pub password: String,
    pub display_currency: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputUserPrefs {
    pub display_currency: Option<String>,
    pub email_reminders_enabled: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputSubscription {
    pub name: String,
    #[serde(default = "default_category")]
    pub category: Category,
    pub amount: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub billing_cycle: BillingCycle,
    #[serde(default = "default_status")]
    pub status: SubscriptionStatus,
    pub renewal_date: String,
    pub trial_end_date: Option<String>,
    pub notes: Option<String>,
    pub household_id: Option<Uuid>,
}

fn default_category() -> Category {
    Category::Other
}

fn default_currency() -> String {
    String::from("USD")
}

fn default_status() -> SubscriptionStatus {
    SubscriptionStatus::Active
}

/// Partial update. Absent fields are untouched; for the nullable fields an
/// explicit null clears the value.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputSubscriptionUpdate {
    pub name: Option<String>,
    pub category: Option<Category>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub billing_cycle: Option<BillingCycle>,
    pub status: Option<SubscriptionStatus>,
    pub renewal_date: Option<String>,
    #[serde(default)]
    pub trial_end_date: Option<Option<String>>,
    #[serde(default)]
    pub notes: Option<Option<String>>,
    #[serde(default)]
    pub household_id: Option<Option<Uuid>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputHousehold {
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputEmailAddress {
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputInviteToken {
    pub token: String,
}

/// An AI-extracted subscription candidate as submitted by the import client.
/// Category and billing cycle arrive as free-form labels; anything
/// unrecognized degrades rather than failing the batch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputImportCandidate {
    pub service_name: String,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub billing_cycle: Option<String>,
    pub renewal_date: Option<String>,
    pub category: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputImportCandidates {
    pub candidates: Vec<InputImportCandidate>,
}
