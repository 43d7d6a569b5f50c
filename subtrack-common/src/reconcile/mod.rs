use uuid::Uuid;

use crate::models::subscription::Subscription;

/// Lowercases and strips everything that isn't ASCII alphanumeric, so
/// "Hello Fresh", "hello-fresh", and "HelloFresh" all collapse to the same
/// key. Matching is exact after normalization; near-miss names are distinct.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// The slice of an existing subscription that matching needs.
#[derive(Clone, Debug)]
pub struct ExistingSubscription {
    pub id: Uuid,
    pub name: String,
    pub amount_cents: i64,
}

impl From<&Subscription> for ExistingSubscription {
    fn from(subscription: &Subscription) -> Self {
        Self {
            id: subscription.id,
            name: subscription.name.clone(),
            amount_cents: subscription.amount_cents,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CandidateMatch {
    New,
    Unchanged {
        existing_id: Uuid,
    },
    PriceChanged {
        existing_id: Uuid,
        existing_amount_cents: i64,
        new_amount_cents: i64,
        delta_cents: i64,
    },
}

/// Classifies an extracted candidate against the user's existing
/// subscriptions. `existing` must be in a stable order (creation order);
/// when two subscriptions normalize to the same name, the first one wins.
/// A candidate is never dropped, only classified.
pub fn classify_candidate(
    service_name: &str,
    amount: f64,
    existing: &[ExistingSubscription],
) -> CandidateMatch {
    let normalized = normalize_name(service_name);

    let matched = existing
        .iter()
        .find(|sub| normalize_name(&sub.name) == normalized);

    let Some(matched) = matched else {
        return CandidateMatch::New;
    };

    let new_amount_cents = (amount * 100.0).round() as i64;

    if matched.amount_cents == new_amount_cents {
        CandidateMatch::Unchanged {
            existing_id: matched.id,
        }
    } else {
        CandidateMatch::PriceChanged {
            existing_id: matched.id,
            existing_amount_cents: matched.amount_cents,
            new_amount_cents,
            delta_cents: new_amount_cents - matched.amount_cents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing(name: &str, amount_cents: i64) -> ExistingSubscription {
        ExistingSubscription {
            id: Uuid::now_v7(),
            name: String::from(name),
            amount_cents,
        }
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Hello Fresh"), "hellofresh");
        assert_eq!(normalize_name("hello-fresh"), "hellofresh");
        assert_eq!(normalize_name("HelloFresh"), "hellofresh");
        assert_eq!(normalize_name("  Netflix  "), "netflix");
        assert_eq!(normalize_name("YouTube Premium!"), "youtubepremium");
    }

    #[test]
    fn test_classify_unchanged() {
        let subs = vec![existing("netflix", 1599)];
        let result = classify_candidate("Netflix", 15.99, &subs);

        assert_eq!(
            result,
            CandidateMatch::Unchanged {
                existing_id: subs[0].id,
            },
        );
    }

    #[test]
    fn test_classify_price_changed_with_delta() {
        let subs = vec![existing("netflix", 1299)];
        let result = classify_candidate("Netflix", 15.99, &subs);

        assert_eq!(
            result,
            CandidateMatch::PriceChanged {
                existing_id: subs[0].id,
                existing_amount_cents: 1299,
                new_amount_cents: 1599,
                delta_cents: 300,
            },
        );
    }

    #[test]
    fn test_classify_price_drop_has_negative_delta() {
        let subs = vec![existing("Spotify", 1099)];
        let result = classify_candidate("spotify", 9.99, &subs);

        assert_eq!(
            result,
            CandidateMatch::PriceChanged {
                existing_id: subs[0].id,
                existing_amount_cents: 1099,
                new_amount_cents: 999,
                delta_cents: -100,
            },
        );
    }

    #[test]
    fn test_classify_new_when_no_match() {
        let subs = vec![existing("netflix", 1599)];
        assert_eq!(classify_candidate("Hulu", 7.99, &subs), CandidateMatch::New);

        // Near-miss names are wholly new, never a price change
        assert_eq!(
            classify_candidate("Netflix Premium", 19.99, &subs),
            CandidateMatch::New,
        );
    }

    #[test]
    fn test_ambiguous_names_resolve_to_first_match() {
        let subs = vec![existing("Hello Fresh", 5999), existing("hellofresh", 6999)];

        let result = classify_candidate("HELLO-FRESH", 59.99, &subs);
        assert_eq!(
            result,
            CandidateMatch::Unchanged {
                existing_id: subs[0].id,
            },
        );
    }
}
