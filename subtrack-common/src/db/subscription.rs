use diesel::{dsl, BoolExpressionMethods, ExpressionMethods, JoinOnDsl, QueryDsl, RunQueryDsl};
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::subscription::{
    BillingCycle, Category, NewSubscription, Subscription, SubscriptionStatus,
};
use crate::models::subscription_history::{NewSubscriptionHistoryEntry, SubscriptionHistoryEntry};
use crate::request_io::format_timestamp;
use crate::schema::subscription_history as subscription_history_fields;
use crate::schema::subscription_history::dsl::subscription_history;
use crate::schema::subscriptions as subscription_fields;
use crate::schema::subscriptions::dsl::subscriptions;
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

// Field names recorded in subscription_history rows. Only these fields are
// tracked; notes and household assignment changes are not.
pub const FIELD_NAME: &str = "name";
pub const FIELD_AMOUNT_CENTS: &str = "amount_cents";
pub const FIELD_BILLING_CYCLE: &str = "billing_cycle";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_RENEWAL_DATE: &str = "renewal_date";
pub const FIELD_CATEGORY: &str = "category";
pub const FIELD_CURRENCY: &str = "currency";

pub struct SubscriptionData<'a> {
    pub name: &'a str,
    pub category: Category,
    pub amount_cents: i64,
    pub currency: &'a str,
    pub billing_cycle: BillingCycle,
    pub status: SubscriptionStatus,
    pub renewal_timestamp: SystemTime,
    pub trial_end_timestamp: Option<SystemTime>,
    pub notes: Option<&'a str>,
    pub household_id: Option<Uuid>,
}

/// A partial edit. `None` leaves a field untouched. The nested options carry
/// explicit nulls for the nullable columns.
#[derive(Clone, Debug, Default)]
pub struct SubscriptionEdits {
    pub name: Option<String>,
    pub category: Option<Category>,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
    pub billing_cycle: Option<BillingCycle>,
    pub status: Option<SubscriptionStatus>,
    pub renewal_timestamp: Option<SystemTime>,
    pub trial_end_timestamp: Option<Option<SystemTime>>,
    pub notes: Option<Option<String>>,
    pub household_id: Option<Option<Uuid>>,
}

fn tracked_values(subscription: &Subscription) -> [(&'static str, String); 7] {
    [
        (FIELD_NAME, subscription.name.clone()),
        (FIELD_AMOUNT_CENTS, subscription.amount_cents.to_string()),
        (
            FIELD_BILLING_CYCLE,
            String::from(subscription.billing_cycle.as_str()),
        ),
        (FIELD_STATUS, String::from(subscription.status.as_str())),
        (
            FIELD_RENEWAL_DATE,
            format_timestamp(subscription.renewal_timestamp),
        ),
        (FIELD_CATEGORY, String::from(subscription.category.as_str())),
        (FIELD_CURRENCY, subscription.currency.clone()),
    ]
}

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn create_subscription(
        &mut self,
        user_id: Uuid,
        data: SubscriptionData,
    ) -> Result<Subscription, DaoError> {
        if data.status == SubscriptionStatus::Trial && data.trial_end_timestamp.is_none() {
            return Err(DaoError::WontRunQuery);
        }

        let current_time = SystemTime::now();
        let new_subscription = NewSubscription {
            id: Uuid::now_v7(),
            user_id,
            household_id: data.household_id,
            name: data.name,
            category: data.category,
            amount_cents: data.amount_cents,
            currency: data.currency,
            billing_cycle: data.billing_cycle,
            status: data.status,
            renewal_timestamp: data.renewal_timestamp,
            trial_end_timestamp: data.trial_end_timestamp,
            notes: data.notes,
            created_timestamp: current_time,
            modified_timestamp: current_time,
        };

        Ok(dsl::insert_into(subscriptions)
            .values(&new_subscription)
            .get_result(&mut self.db_thread_pool.get()?)?)
    }

    /// Fetches a subscription the user can see, either as its owner or as a
    /// member of the household it is shared with.
    pub fn get_subscription(
        &mut self,
        subscription_id: Uuid,
        user_id: Uuid,
        household_id: Option<Uuid>,
    ) -> Result<Subscription, DaoError> {
        let query = match household_id {
            Some(household_id) => subscriptions
                .find(subscription_id)
                .filter(
                    subscription_fields::user_id
                        .eq(user_id)
                        .or(subscription_fields::household_id.eq(household_id)),
                )
                .into_boxed(),
            None => subscriptions
                .find(subscription_id)
                .filter(subscription_fields::user_id.eq(user_id))
                .into_boxed(),
        };

        Ok(query.get_result(&mut self.db_thread_pool.get()?)?)
    }

    /// All subscriptions visible to the user, newest first. Household-shared
    /// subscriptions owned by other members are included when the user belongs
    /// to a household.
    pub fn get_all_subscriptions_for_user(
        &mut self,
        user_id: Uuid,
        household_id: Option<Uuid>,
    ) -> Result<Vec<Subscription>, DaoError> {
        let query = match household_id {
            Some(household_id) => subscriptions
                .filter(
                    subscription_fields::user_id
                        .eq(user_id)
                        .or(subscription_fields::household_id.eq(household_id)),
                )
                .into_boxed(),
            None => subscriptions
                .filter(subscription_fields::user_id.eq(user_id))
                .into_boxed(),
        };

        Ok(query
            .order((
                subscription_fields::created_timestamp.desc(),
                subscription_fields::id.desc(),
            ))
            .load(&mut self.db_thread_pool.get()?)?)
    }

    /// The user's own subscriptions in creation order. Import reconciliation
    /// depends on this ordering being stable.
    pub fn get_owned_subscriptions(&mut self, user_id: Uuid) -> Result<Vec<Subscription>, DaoError> {
        Ok(subscriptions
            .filter(subscription_fields::user_id.eq(user_id))
            .order((
                subscription_fields::created_timestamp.asc(),
                subscription_fields::id.asc(),
            ))
            .load(&mut self.db_thread_pool.get()?)?)
    }

    /// Applies a partial edit to a subscription the user owns and records one
    /// history row per tracked field that changed, all sharing a single
    /// timestamp.
    pub fn update_subscription(
        &mut self,
        subscription_id: Uuid,
        user_id: Uuid,
        edits: SubscriptionEdits,
    ) -> Result<Subscription, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<Subscription, DaoError, _>(|conn| {
                let existing = subscriptions
                    .find(subscription_id)
                    .filter(subscription_fields::user_id.eq(user_id))
                    .get_result::<Subscription>(conn)?;

                let current_time = SystemTime::now();
                let merged = Subscription {
                    id: existing.id,
                    user_id: existing.user_id,
                    household_id: edits.household_id.unwrap_or(existing.household_id),
                    name: edits.name.unwrap_or_else(|| existing.name.clone()),
                    category: edits.category.unwrap_or(existing.category),
                    amount_cents: edits.amount_cents.unwrap_or(existing.amount_cents),
                    currency: edits.currency.unwrap_or_else(|| existing.currency.clone()),
                    billing_cycle: edits.billing_cycle.unwrap_or(existing.billing_cycle),
                    status: edits.status.unwrap_or(existing.status),
                    renewal_timestamp: edits
                        .renewal_timestamp
                        .unwrap_or(existing.renewal_timestamp),
                    trial_end_timestamp: edits
                        .trial_end_timestamp
                        .unwrap_or(existing.trial_end_timestamp),
                    notes: edits.notes.unwrap_or_else(|| existing.notes.clone()),
                    created_timestamp: existing.created_timestamp,
                    modified_timestamp: current_time,
                };

                if merged.status == SubscriptionStatus::Trial
                    && merged.trial_end_timestamp.is_none()
                {
                    return Err(DaoError::WontRunQuery);
                }

                let old_values = tracked_values(&existing);
                let new_values = tracked_values(&merged);
                let changed = old_values
                    .iter()
                    .zip(new_values.iter())
                    .filter(|(old, new)| old.1 != new.1)
                    .collect::<Vec<_>>();

                let history_entries = changed
                    .iter()
                    .map(|(old, new)| NewSubscriptionHistoryEntry {
                        id: Uuid::now_v7(),
                        subscription_id,
                        user_id,
                        field: old.0,
                        old_value: Some(&old.1),
                        new_value: Some(&new.1),
                        changed_timestamp: current_time,
                    })
                    .collect::<Vec<_>>();

                if !history_entries.is_empty() {
                    dsl::insert_into(subscription_history)
                        .values(&history_entries)
                        .execute(conn)?;
                }

                Ok(dsl::update(subscriptions.find(subscription_id))
                    .set((
                        subscription_fields::household_id.eq(merged.household_id),
                        subscription_fields::name.eq(&merged.name),
                        subscription_fields::category.eq(merged.category),
                        subscription_fields::amount_cents.eq(merged.amount_cents),
                        subscription_fields::currency.eq(&merged.currency),
                        subscription_fields::billing_cycle.eq(merged.billing_cycle),
                        subscription_fields::status.eq(merged.status),
                        subscription_fields::renewal_timestamp.eq(merged.renewal_timestamp),
                        subscription_fields::trial_end_timestamp.eq(merged.trial_end_timestamp),
                        subscription_fields::notes.eq(merged.notes.as_deref()),
                        subscription_fields::modified_timestamp.eq(merged.modified_timestamp),
                    ))
                    .get_result::<Subscription>(conn)?)
            })
    }

    pub fn delete_subscription(
        &mut self,
        subscription_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<(), DaoError, _>(|conn| {
                dsl::delete(
                    subscription_history
                        .filter(subscription_history_fields::subscription_id.eq(subscription_id))
                        .filter(subscription_history_fields::user_id.eq(user_id)),
                )
                .execute(conn)?;

                let affected_row_count = dsl::delete(
                    subscriptions
                        .find(subscription_id)
                        .filter(subscription_fields::user_id.eq(user_id)),
                )
                .execute(conn)?;

                if affected_row_count == 0 {
                    return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
                }

                Ok(())
            })
    }

    /// History for a single subscription, newest change first. Unlike
    /// `get_subscription`, audit rows are visible to the owner only.
    pub fn get_subscription_history(
        &mut self,
        subscription_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<SubscriptionHistoryEntry>, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<Vec<SubscriptionHistoryEntry>, DaoError, _>(|conn| {
                subscriptions
                    .find(subscription_id)
                    .filter(subscription_fields::user_id.eq(user_id))
                    .get_result::<Subscription>(conn)?;

                Ok(subscription_history
                    .filter(subscription_history_fields::subscription_id.eq(subscription_id))
                    .order((
                        subscription_history_fields::changed_timestamp.desc(),
                        subscription_history_fields::id.desc(),
                    ))
                    .load(conn)?)
            })
    }

    /// All amount changes across the user's subscriptions, oldest first.
    /// Spending history reconstruction requires ascending order.
    pub fn get_amount_changes_for_user(
        &mut self,
        user_id: Uuid,
    ) -> Result<Vec<SubscriptionHistoryEntry>, DaoError> {
        Ok(subscription_history
            .filter(subscription_history_fields::user_id.eq(user_id))
            .filter(subscription_history_fields::field.eq(FIELD_AMOUNT_CENTS))
            .order((
                subscription_history_fields::changed_timestamp.asc(),
                subscription_history_fields::id.asc(),
            ))
            .load(&mut self.db_thread_pool.get()?)?)
    }

    /// Active subscriptions renewing inside the window, paired with their
    /// owner's email address. Users who turned reminders off are skipped.
    pub fn get_upcoming_renewals(
        &mut self,
        range_start: SystemTime,
        range_end: SystemTime,
    ) -> Result<Vec<(String, Subscription)>, DaoError> {
        Ok(subscriptions
            .inner_join(users.on(user_fields::id.eq(subscription_fields::user_id)))
            .filter(subscription_fields::status.eq(SubscriptionStatus::Active))
            .filter(subscription_fields::renewal_timestamp.ge(range_start))
            .filter(subscription_fields::renewal_timestamp.le(range_end))
            .filter(user_fields::email_reminders_enabled.eq(true))
            .order((
                user_fields::email.asc(),
                subscription_fields::renewal_timestamp.asc(),
            ))
            .select((user_fields::email, subscription_fields::all_columns))
            .load::<(String, Subscription)>(&mut self.db_thread_pool.get()?)?)
    }

    /// Trial subscriptions whose trial ends inside the window, paired with
    /// their owner's email address.
    pub fn get_expiring_trials(
        &mut self,
        range_start: SystemTime,
        range_end: SystemTime,
    ) -> Result<Vec<(String, Subscription)>, DaoError> {
        Ok(subscriptions
            .inner_join(users.on(user_fields::id.eq(subscription_fields::user_id)))
            .filter(subscription_fields::status.eq(SubscriptionStatus::Trial))
            .filter(subscription_fields::trial_end_timestamp.ge(Some(range_start)))
            .filter(subscription_fields::trial_end_timestamp.le(Some(range_end)))
            .filter(user_fields::email_reminders_enabled.eq(true))
            .order((
                user_fields::email.asc(),
                subscription_fields::trial_end_timestamp.asc(),
            ))
            .select((user_fields::email, subscription_fields::all_columns))
            .load::<(String, Subscription)>(&mut self.db_thread_pool.get()?)?)
    }
}
