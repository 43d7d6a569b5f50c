use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::household::Household;
use crate::models::household_member::HouseholdRole;
use crate::models::subscription::{BillingCycle, Category, Subscription, SubscriptionStatus};
use crate::models::subscription_history::SubscriptionHistoryEntry;
use crate::models::user::User;
use crate::money;
use crate::request_io::format_timestamp;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub server_time: u128,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputUser {
    pub id: Uuid,
    pub email: String,
    pub display_currency: String,
    pub household_id: Option<Uuid>,
    pub email_reminders_enabled: bool,
}

impl From<User> for OutputUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_currency: user.display_currency,
            household_id: user.household_id,
            email_reminders_enabled: user.email_reminders_enabled,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputSubscription {
    pub id: Uuid,
    pub name: String,
    pub category: Category,
    pub amount: String,
    pub amount_cents: i64,
    pub currency: String,
    pub billing_cycle: BillingCycle,
    pub status: SubscriptionStatus,
    pub renewal_date: String,
    pub trial_end_date: Option<String>,
    pub notes: Option<String>,
    pub household_id: Option<Uuid>,
    pub readonly: bool,
    pub created_at: String,
    pub modified_at: String,
}

impl OutputSubscription {
    pub fn from_subscription(subscription: Subscription, readonly: bool) -> Self {
        Self {
            id: subscription.id,
            amount: money::format_amount(subscription.amount_cents),
            amount_cents: subscription.amount_cents,
            name: subscription.name,
            category: subscription.category,
            currency: subscription.currency,
            billing_cycle: subscription.billing_cycle,
            status: subscription.status,
            renewal_date: format_timestamp(subscription.renewal_timestamp),
            trial_end_date: subscription.trial_end_timestamp.map(format_timestamp),
            notes: subscription.notes,
            household_id: subscription.household_id,
            readonly,
            created_at: format_timestamp(subscription.created_timestamp),
            modified_at: format_timestamp(subscription.modified_timestamp),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputSubscriptionHistoryEntry {
    pub id: Uuid,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_at: String,
}

impl From<SubscriptionHistoryEntry> for OutputSubscriptionHistoryEntry {
    fn from(entry: SubscriptionHistoryEntry) -> Self {
        Self {
            id: entry.id,
            field: entry.field,
            old_value: entry.old_value,
            new_value: entry.new_value,
            changed_at: format_timestamp(entry.changed_timestamp),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputHouseholdMember {
    pub user_id: Uuid,
    pub email: String,
    pub role: HouseholdRole,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputHousehold {
    pub id: Uuid,
    pub name: String,
    pub owner_user_id: Uuid,
    pub members: Vec<OutputHouseholdMember>,
}

impl OutputHousehold {
    pub fn from_household(household: Household, members: Vec<OutputHouseholdMember>) -> Self {
        Self {
            id: household.id,
            name: household.name,
            owner_user_id: household.owner_user_id,
            members,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputExchangeRates {
    pub base: String,
    pub rates: HashMap<String, f64>,
    pub fallback: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputMonthTotal {
    pub label: String,
    pub total_cents: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputSpendingHistory {
    pub months: Vec<OutputMonthTotal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_from_previous_month: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputCategoryTotal {
    pub category: Category,
    pub total_cents: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputCategoryBreakdown {
    pub display_currency: String,
    pub rates_fallback: bool,
    pub total_monthly_cents: i64,
    pub categories: Vec<OutputCategoryTotal>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputReconciledCandidate {
    pub service_name: String,
    pub amount: f64,
    pub currency: String,
    pub billing_cycle: Option<String>,
    pub renewal_date: Option<String>,
    pub category: Category,
    pub is_existing: bool,
    pub price_changed: bool,
    pub existing_id: Option<Uuid>,
    pub existing_amount_cents: Option<i64>,
    pub new_amount_cents: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputReconciledCandidates {
    pub candidates: Vec<OutputReconciledCandidate>,
}
