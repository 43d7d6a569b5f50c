use chrono::{DateTime, Datelike, TimeZone, Utc};
use std::collections::BTreeMap;
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::subscription::{BillingCycle, Category, Subscription, SubscriptionStatus};
use crate::models::subscription_history::SubscriptionHistoryEntry;
use crate::money;
use crate::rates::ExchangeRates;

/// The slice of a subscription the reconstructor needs.
#[derive(Clone, Debug)]
pub struct SpendRecord {
    pub subscription_id: Uuid,
    pub amount_cents: i64,
    pub billing_cycle: BillingCycle,
    pub status: SubscriptionStatus,
    pub created_timestamp: SystemTime,
}

impl From<&Subscription> for SpendRecord {
    fn from(subscription: &Subscription) -> Self {
        Self {
            subscription_id: subscription.id,
            amount_cents: subscription.amount_cents,
            billing_cycle: subscription.billing_cycle,
            status: subscription.status,
            created_timestamp: subscription.created_timestamp,
        }
    }
}

/// An amount-change audit row with its values parsed out of their string
/// encoding. Unparseable values are treated as absent.
#[derive(Clone, Debug)]
pub struct AmountChange {
    pub subscription_id: Uuid,
    pub old_amount_cents: Option<i64>,
    pub new_amount_cents: Option<i64>,
    pub changed_timestamp: SystemTime,
}

impl From<&SubscriptionHistoryEntry> for AmountChange {
    fn from(entry: &SubscriptionHistoryEntry) -> Self {
        Self {
            subscription_id: entry.subscription_id,
            old_amount_cents: entry.old_value.as_deref().and_then(|v| v.parse().ok()),
            new_amount_cents: entry.new_value.as_deref().and_then(|v| v.parse().ok()),
            changed_timestamp: entry.changed_timestamp,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MonthWindow {
    pub label: String,
    pub end: SystemTime,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MonthTotal {
    pub label: String,
    pub total_cents: i64,
}

/// Builds windows for the trailing `count` calendar months (including the
/// month containing `now`), oldest first, labeled like "Mar 2026". Each
/// window's `end` is the final second of that month.
pub fn trailing_months(now: DateTime<Utc>, count: u32) -> Vec<MonthWindow> {
    let mut months = Vec::with_capacity(count as usize);

    for offset in (0..count as i32).rev() {
        let month_index = now.year() * 12 + now.month0() as i32 - offset;
        let year = month_index.div_euclid(12);
        let month = month_index.rem_euclid(12) as u32 + 1;

        let start = Utc
            .with_ymd_and_hms(year, month, 1, 0, 0, 0)
            .single()
            .expect("First of a month is always a valid date");

        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };

        let next_start = Utc
            .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
            .single()
            .expect("First of a month is always a valid date");

        months.push(MonthWindow {
            label: start.format("%b %Y").to_string(),
            end: SystemTime::from(next_start - chrono::Duration::seconds(1)),
        });
    }

    months
}

/// Computes the amount that was effective for `record` at instant `at`.
///
/// Returns `None` when the subscription did not exist yet. When amount
/// changes at or before `at` exist, the latest one's new value wins (`changes`
/// must be ordered by changed timestamp ascending; later input order breaks
/// ties). When the only recorded changes are later than `at`, the earliest
/// one's old value is the baseline. With no recorded changes at all, the
/// current stored amount is assumed to have always been in effect. That last
/// assumption is wrong for amounts changed before tracking began; it is the
/// documented behavior.
pub fn effective_amount_at(
    record: &SpendRecord,
    changes: &[AmountChange],
    at: SystemTime,
) -> Option<i64> {
    if record.created_timestamp > at {
        return None;
    }

    let mut latest_before: Option<&AmountChange> = None;
    let mut earliest_after: Option<&AmountChange> = None;

    for change in changes {
        if change.subscription_id != record.subscription_id {
            continue;
        }

        if change.changed_timestamp <= at {
            latest_before = Some(change);
        } else if earliest_after.is_none() {
            earliest_after = Some(change);
        }
    }

    let effective = match (latest_before, earliest_after) {
        (Some(change), _) => change.new_amount_cents.unwrap_or(record.amount_cents),
        (None, Some(change)) => change.old_amount_cents.unwrap_or(record.amount_cents),
        (None, None) => record.amount_cents,
    };

    Some(effective)
}

/// Reconstructed monthly-equivalent totals for each window, evaluated at the
/// window's end boundary. Subscriptions whose current status is paused are
/// excluded from every window, and the current billing cycle is applied to
/// historical amounts.
pub fn monthly_totals(
    records: &[SpendRecord],
    changes: &[AmountChange],
    months: &[MonthWindow],
) -> Vec<MonthTotal> {
    months
        .iter()
        .map(|month| {
            let mut total = 0;

            for record in records {
                if record.status == SubscriptionStatus::Paused {
                    continue;
                }

                let Some(amount) = effective_amount_at(record, changes, month.end) else {
                    continue;
                };

                total += money::to_monthly_cents(amount, record.billing_cycle);
            }

            MonthTotal {
                label: month.label.clone(),
                total_cents: total,
            }
        })
        .collect()
}

/// Signed whole-percent change from the second-to-last to the last month.
/// `None` when there is no previous month or its total is zero.
pub fn change_from_previous_month(totals: &[MonthTotal]) -> Option<i64> {
    if totals.len() < 2 {
        return None;
    }

    let current = totals[totals.len() - 1].total_cents;
    let previous = totals[totals.len() - 2].total_cents;

    if previous == 0 {
        return None;
    }

    Some((((current - previous) as f64 / previous as f64) * 100.0).round() as i64)
}

/// Monthly-equivalent spend per category in the display currency, paused
/// subscriptions excluded. Ordered by category.
pub fn category_breakdown(
    subscriptions: &[Subscription],
    rates: &ExchangeRates,
    display_currency: &str,
) -> BTreeMap<Category, i64> {
    let mut totals = BTreeMap::new();

    for subscription in subscriptions {
        if subscription.status == SubscriptionStatus::Paused {
            continue;
        }

        let monthly =
            money::to_monthly_cents(subscription.amount_cents, subscription.billing_cycle);
        let converted = rates.convert(monthly, &subscription.currency, display_currency);

        *totals.entry(subscription.category).or_insert(0) += converted;
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    fn timestamp(year: i32, month: u32, day: u32) -> SystemTime {
        SystemTime::from(
            Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
                .single()
                .unwrap(),
        )
    }

    fn record(
        id: Uuid,
        amount_cents: i64,
        billing_cycle: BillingCycle,
        status: SubscriptionStatus,
        created: SystemTime,
    ) -> SpendRecord {
        SpendRecord {
            subscription_id: id,
            amount_cents,
            billing_cycle,
            status,
            created_timestamp: created,
        }
    }

    fn amount_change(id: Uuid, old: i64, new: i64, changed: SystemTime) -> AmountChange {
        AmountChange {
            subscription_id: id,
            old_amount_cents: Some(old),
            new_amount_cents: Some(new),
            changed_timestamp: changed,
        }
    }

    #[test]
    fn test_trailing_months_labels_oldest_first() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 10, 30, 0).single().unwrap();
        let months = trailing_months(now, 6);

        let labels: Vec<&str> = months.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(
            labels,
            ["Oct 2025", "Nov 2025", "Dec 2025", "Jan 2026", "Feb 2026", "Mar 2026"],
        );
    }

    #[test]
    fn test_trailing_months_end_boundaries() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 10, 30, 0).single().unwrap();
        let months = trailing_months(now, 2);

        // Feb 2026 ends at 2026-02-28T23:59:59Z
        let feb_end = Utc.with_ymd_and_hms(2026, 2, 28, 23, 59, 59).single().unwrap();
        assert_eq!(months[0].end, SystemTime::from(feb_end));

        let mar_end = Utc.with_ymd_and_hms(2026, 3, 31, 23, 59, 59).single().unwrap();
        assert_eq!(months[1].end, SystemTime::from(mar_end));
    }

    #[test]
    fn test_effective_amount_reconstruction() {
        let id = Uuid::now_v7();

        // Created Jan 1 at 1000, raised to 1500 on Mar 1
        let record = record(
            id,
            1500,
            BillingCycle::Monthly,
            SubscriptionStatus::Active,
            timestamp(2026, 1, 1),
        );
        let changes = vec![amount_change(id, 1000, 1500, timestamp(2026, 3, 1))];

        let feb_end = timestamp(2026, 2, 28);
        let apr_end = timestamp(2026, 4, 30);

        assert_eq!(effective_amount_at(&record, &changes, feb_end), Some(1000));
        assert_eq!(effective_amount_at(&record, &changes, apr_end), Some(1500));
    }

    #[test]
    fn test_effective_amount_before_creation() {
        let id = Uuid::now_v7();
        let record = record(
            id,
            1000,
            BillingCycle::Monthly,
            SubscriptionStatus::Active,
            timestamp(2026, 3, 1),
        );

        assert_eq!(effective_amount_at(&record, &[], timestamp(2026, 2, 1)), None);
        assert_eq!(
            effective_amount_at(&record, &[], timestamp(2026, 4, 1)),
            Some(1000),
        );
    }

    #[test]
    fn test_effective_amount_latest_change_wins() {
        let id = Uuid::now_v7();
        let record = record(
            id,
            2000,
            BillingCycle::Monthly,
            SubscriptionStatus::Active,
            timestamp(2026, 1, 1),
        );
        let changes = vec![
            amount_change(id, 1000, 1200, timestamp(2026, 2, 1)),
            amount_change(id, 1200, 2000, timestamp(2026, 4, 1)),
        ];

        assert_eq!(
            effective_amount_at(&record, &changes, timestamp(2026, 3, 1)),
            Some(1200),
        );
        assert_eq!(
            effective_amount_at(&record, &changes, timestamp(2026, 5, 1)),
            Some(2000),
        );
        assert_eq!(
            effective_amount_at(&record, &changes, timestamp(2026, 1, 15)),
            Some(1000),
        );
    }

    #[test]
    fn test_effective_amount_assumes_current_without_history() {
        // With no recorded changes, the current amount is assumed to have
        // always been in effect. Wrong for amounts changed before tracking
        // began; documented behavior.
        let id = Uuid::now_v7();
        let record = record(
            id,
            1500,
            BillingCycle::Monthly,
            SubscriptionStatus::Active,
            timestamp(2025, 1, 1),
        );

        assert_eq!(
            effective_amount_at(&record, &[], timestamp(2025, 6, 1)),
            Some(1500),
        );
    }

    #[test]
    fn test_monthly_totals_excludes_paused() {
        let active_id = Uuid::now_v7();
        let paused_id = Uuid::now_v7();

        let records = vec![
            record(
                active_id,
                1000,
                BillingCycle::Monthly,
                SubscriptionStatus::Active,
                timestamp(2025, 1, 1),
            ),
            record(
                paused_id,
                9999,
                BillingCycle::Monthly,
                SubscriptionStatus::Paused,
                timestamp(2025, 1, 1),
            ),
        ];

        let months = trailing_months(
            Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).single().unwrap(),
            6,
        );
        let totals = monthly_totals(&records, &[], &months);

        for total in totals {
            assert_eq!(total.total_cents, 1000);
        }
    }

    #[test]
    fn test_monthly_totals_applies_current_billing_cycle() {
        let id = Uuid::now_v7();
        let records = vec![record(
            id,
            12000,
            BillingCycle::Annual,
            SubscriptionStatus::Active,
            timestamp(2025, 1, 1),
        )];

        let months = trailing_months(
            Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).single().unwrap(),
            3,
        );
        let totals = monthly_totals(&records, &[], &months);

        assert_eq!(totals.len(), 3);
        for total in totals {
            assert_eq!(total.total_cents, 1000);
        }
    }

    #[test]
    fn test_monthly_totals_skips_months_before_creation() {
        let id = Uuid::now_v7();
        let records = vec![record(
            id,
            1000,
            BillingCycle::Monthly,
            SubscriptionStatus::Active,
            timestamp(2026, 2, 10),
        )];

        let months = trailing_months(
            Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).single().unwrap(),
            3,
        );
        let totals = monthly_totals(&records, &[], &months);

        assert_eq!(totals[0].total_cents, 0); // Jan
        assert_eq!(totals[1].total_cents, 1000); // Feb
        assert_eq!(totals[2].total_cents, 1000); // Mar
    }

    #[test]
    fn test_change_from_previous_month() {
        let totals = vec![
            MonthTotal {
                label: String::from("Jan 2026"),
                total_cents: 1000,
            },
            MonthTotal {
                label: String::from("Feb 2026"),
                total_cents: 1500,
            },
        ];

        assert_eq!(change_from_previous_month(&totals), Some(50));

        let declining = vec![
            MonthTotal {
                label: String::from("Jan 2026"),
                total_cents: 1000,
            },
            MonthTotal {
                label: String::from("Feb 2026"),
                total_cents: 900,
            },
        ];

        assert_eq!(change_from_previous_month(&declining), Some(-10));
    }

    #[test]
    fn test_change_from_previous_month_omitted_when_previous_is_zero() {
        let totals = vec![
            MonthTotal {
                label: String::from("Jan 2026"),
                total_cents: 0,
            },
            MonthTotal {
                label: String::from("Feb 2026"),
                total_cents: 1500,
            },
        ];

        assert_eq!(change_from_previous_month(&totals), None);
        assert_eq!(change_from_previous_month(&totals[1..]), None);
    }

    #[test]
    fn test_category_breakdown_converts_and_excludes_paused() {
        let now = SystemTime::now();
        let base = Subscription {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            household_id: None,
            name: String::from("Netflix"),
            category: Category::Streaming,
            amount_cents: 1000,
            currency: String::from("USD"),
            billing_cycle: BillingCycle::Monthly,
            status: SubscriptionStatus::Active,
            renewal_timestamp: now + Duration::from_secs(86400),
            trial_end_timestamp: None,
            notes: None,
            created_timestamp: now,
            modified_timestamp: now,
        };

        let eur_annual = Subscription {
            id: Uuid::now_v7(),
            name: String::from("Spotify"),
            category: Category::Music,
            amount_cents: 6000,
            currency: String::from("EUR"),
            billing_cycle: BillingCycle::Annual,
            ..base.clone()
        };

        let paused = Subscription {
            id: Uuid::now_v7(),
            name: String::from("Gym"),
            category: Category::Fitness,
            status: SubscriptionStatus::Paused,
            ..base.clone()
        };

        let mut rate_table = std::collections::HashMap::new();
        rate_table.insert(String::from("USD"), 1.0);
        rate_table.insert(String::from("EUR"), 0.5);
        let rates = ExchangeRates {
            rates: rate_table,
            fallback: false,
        };

        let breakdown = category_breakdown(&[base, eur_annual, paused], &rates, "USD");

        assert_eq!(breakdown.get(&Category::Streaming), Some(&1000));
        // 6000 EUR annually -> 500 EUR monthly -> 1000 USD
        assert_eq!(breakdown.get(&Category::Music), Some(&1000));
        assert_eq!(breakdown.get(&Category::Fitness), None);
    }
}
