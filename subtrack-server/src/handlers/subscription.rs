use subtrack_common::db::subscription::{SubscriptionData, SubscriptionEdits};
use subtrack_common::db::{self, DaoError, DbThreadPool};
use subtrack_common::models::subscription::SubscriptionStatus;
use subtrack_common::request_io::{
    parse_date_or_datetime, InputSubscription, InputSubscriptionUpdate,
    OutputSubscription, OutputSubscriptionHistoryEntry,
};
use subtrack_common::money;
use subtrack_common::validators::{self, Validity};

use actix_web::{web, HttpResponse};
use std::time::SystemTime;
use uuid::Uuid;

use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeader;

const MAX_NAME_LENGTH: usize = 100;
const MAX_NOTES_LENGTH: usize = 200;

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    subscription_data: web::Json<InputSubscription>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let subscription_data = subscription_data.into_inner();
    let user_id = user_access_token.claims.user_id;

    if subscription_data.name.trim().is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "Subscription name cannot be empty",
        )));
    }

    if subscription_data.name.len() > MAX_NAME_LENGTH {
        return Err(HttpErrorResponse::InputTooLarge(format!(
            "Subscription name is too long. Max: {MAX_NAME_LENGTH} bytes",
        )));
    }

    if let Some(ref notes) = subscription_data.notes {
        if notes.len() > MAX_NOTES_LENGTH {
            return Err(HttpErrorResponse::InputTooLarge(format!(
                "Notes are too long. Max: {MAX_NOTES_LENGTH} bytes",
            )));
        }
    }

    let amount_cents = match money::parse_amount(&subscription_data.amount) {
        Ok(cents) => cents,
        Err(e) => {
            return Err(HttpErrorResponse::IncorrectlyFormed(format!(
                "Invalid amount: {e}",
            )));
        }
    };

    if let Validity::Invalid(msg) = validators::validate_currency_code(&subscription_data.currency)
    {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let renewal_timestamp = parse_timestamp(&subscription_data.renewal_date, "renewal_date")?;
    let trial_end_timestamp = match subscription_data.trial_end_date {
        Some(ref date) => Some(parse_timestamp(date, "trial_end_date")?),
        None => None,
    };

    if subscription_data.status == SubscriptionStatus::Trial && trial_end_timestamp.is_none() {
        return Err(HttpErrorResponse::InvalidState(String::from(
            "A trial subscription requires a trial end date",
        )));
    }

    let subscription = match web::block(move || {
        let mut user_dao = db::user::Dao::new(&db_thread_pool);
        let user = user_dao.get_user_by_id(user_id)?;

        // Shared subscriptions may only go to the household the owner is in
        if let Some(household_id) = subscription_data.household_id {
            if user.household_id != Some(household_id) {
                return Err(DaoError::WontRunQuery);
            }
        }

        let mut subscription_dao = db::subscription::Dao::new(&db_thread_pool);
        subscription_dao.create_subscription(
            user_id,
            SubscriptionData {
                name: subscription_data.name.trim(),
                category: subscription_data.category,
                amount_cents,
                currency: &subscription_data.currency,
                billing_cycle: subscription_data.billing_cycle,
                status: subscription_data.status,
                renewal_timestamp,
                trial_end_timestamp,
                notes: subscription_data.notes.as_deref(),
                household_id: subscription_data.household_id,
            },
        )
    })
    .await?
    {
        Ok(s) => s,
        Err(DaoError::WontRunQuery) => {
            return Err(HttpErrorResponse::UserDisallowed(String::from(
                "Subscriptions can only be shared with the user's own household",
            )));
        }
        Err(DaoError::QueryFailure(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::ForeignKeyViolation,
            _,
        ))) => {
            return Err(HttpErrorResponse::ForeignKeyDoesNotExist(String::from(
                "No household with provided ID",
            )));
        }
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("No user with provided ID"),
                DoesNotExistType::User,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to create subscription",
            )));
        }
    };

    Ok(HttpResponse::Created().json(OutputSubscription::from_subscription(subscription, false)))
}

pub async fn get_all(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let subscriptions = match web::block(move || {
        let mut user_dao = db::user::Dao::new(&db_thread_pool);
        let user = user_dao.get_user_by_id(user_id)?;

        let mut subscription_dao = db::subscription::Dao::new(&db_thread_pool);
        subscription_dao.get_all_subscriptions_for_user(user_id, user.household_id)
    })
    .await?
    {
        Ok(s) => s,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get subscriptions",
            )));
        }
    };

    let output = subscriptions
        .into_iter()
        .map(|s| {
            let readonly = s.user_id != user_id;
            OutputSubscription::from_subscription(s, readonly)
        })
        .collect::<Vec<_>>();

    Ok(HttpResponse::Ok().json(output))
}

pub async fn get_one(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    subscription_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let subscription_id = subscription_id.into_inner();

    let subscription = match web::block(move || {
        let mut user_dao = db::user::Dao::new(&db_thread_pool);
        let user = user_dao.get_user_by_id(user_id)?;

        let mut subscription_dao = db::subscription::Dao::new(&db_thread_pool);
        subscription_dao.get_subscription(subscription_id, user_id, user.household_id)
    })
    .await?
    {
        Ok(s) => s,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("No subscription with provided ID"),
                DoesNotExistType::Subscription,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get subscription",
            )));
        }
    };

    let readonly = subscription.user_id != user_id;
    Ok(HttpResponse::Ok().json(OutputSubscription::from_subscription(subscription, readonly)))
}

pub async fn edit(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    subscription_id: web::Path<Uuid>,
    update: web::Json<InputSubscriptionUpdate>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let update = update.into_inner();
    let user_id = user_access_token.claims.user_id;
    let subscription_id = subscription_id.into_inner();

    if update.name.is_none()
        && update.category.is_none()
        && update.amount.is_none()
        && update.currency.is_none()
        && update.billing_cycle.is_none()
        && update.status.is_none()
        && update.renewal_date.is_none()
        && update.trial_end_date.is_none()
        && update.notes.is_none()
        && update.household_id.is_none()
    {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "No fields were provided",
        )));
    }

    if let Some(ref name) = update.name {
        if name.trim().is_empty() {
            return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
                "Subscription name cannot be empty",
            )));
        }

        if name.len() > MAX_NAME_LENGTH {
            return Err(HttpErrorResponse::InputTooLarge(format!(
                "Subscription name is too long. Max: {MAX_NAME_LENGTH} bytes",
            )));
        }
    }

    if let Some(Some(ref notes)) = update.notes {
        if notes.len() > MAX_NOTES_LENGTH {
            return Err(HttpErrorResponse::InputTooLarge(format!(
                "Notes are too long. Max: {MAX_NOTES_LENGTH} bytes",
            )));
        }
    }

    let amount_cents = match update.amount {
        Some(ref amount) => match money::parse_amount(amount) {
            Ok(cents) => Some(cents),
            Err(e) => {
                return Err(HttpErrorResponse::IncorrectlyFormed(format!(
                    "Invalid amount: {e}",
                )));
            }
        },
        None => None,
    };

    if let Some(ref currency) = update.currency {
        if let Validity::Invalid(msg) = validators::validate_currency_code(currency) {
            return Err(HttpErrorResponse::IncorrectlyFormed(msg));
        }
    }

    let renewal_timestamp = match update.renewal_date {
        Some(ref date) => Some(parse_timestamp(date, "renewal_date")?),
        None => None,
    };

    let trial_end_timestamp = match update.trial_end_date {
        Some(Some(ref date)) => Some(Some(parse_timestamp(date, "trial_end_date")?)),
        Some(None) => Some(None),
        None => None,
    };

    let edits = SubscriptionEdits {
        name: update.name.map(|n| String::from(n.trim())),
        category: update.category,
        amount_cents,
        currency: update.currency,
        billing_cycle: update.billing_cycle,
        status: update.status,
        renewal_timestamp,
        trial_end_timestamp,
        notes: update.notes,
        household_id: update.household_id,
    };

    let subscription = match web::block(move || {
        // An edit can attach the subscription to a household, so the same
        // ownership rule as creation applies
        if let Some(Some(household_id)) = edits.household_id {
            let mut user_dao = db::user::Dao::new(&db_thread_pool);
            let user = user_dao.get_user_by_id(user_id)?;

            if user.household_id != Some(household_id) {
                return Err(DaoError::WontRunQuery);
            }
        }

        let mut subscription_dao = db::subscription::Dao::new(&db_thread_pool);
        subscription_dao.update_subscription(subscription_id, user_id, edits)
    })
    .await?
    {
        Ok(s) => s,
        Err(DaoError::WontRunQuery) => {
            return Err(HttpErrorResponse::InvalidState(String::from(
                "Subscription could not be saved. A trial subscription requires a trial end \
                 date, and sharing requires membership in the target household",
            )));
        }
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("No subscription with provided ID belongs to the user"),
                DoesNotExistType::Subscription,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to update subscription",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(OutputSubscription::from_subscription(subscription, false)))
}

pub async fn delete(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    subscription_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let subscription_id = subscription_id.into_inner();

    match web::block(move || {
        let mut subscription_dao = db::subscription::Dao::new(&db_thread_pool);
        subscription_dao.delete_subscription(subscription_id, user_id)
    })
    .await?
    {
        Ok(()) => (),
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("No subscription with provided ID belongs to the user"),
                DoesNotExistType::Subscription,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to delete subscription",
            )));
        }
    };

    Ok(HttpResponse::Ok().finish())
}

pub async fn get_history(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    subscription_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let subscription_id = subscription_id.into_inner();

    let history = match web::block(move || {
        let mut subscription_dao = db::subscription::Dao::new(&db_thread_pool);
        subscription_dao.get_subscription_history(subscription_id, user_id)
    })
    .await?
    {
        Ok(h) => h,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("No subscription with provided ID"),
                DoesNotExistType::Subscription,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get subscription history",
            )));
        }
    };

    let output = history
        .into_iter()
        .map(OutputSubscriptionHistoryEntry::from)
        .collect::<Vec<_>>();

    Ok(HttpResponse::Ok().json(output))
}

fn parse_timestamp(value: &str, field_name: &str) -> Result<SystemTime, HttpErrorResponse> {
    parse_date_or_datetime(value).ok_or_else(|| {
        HttpErrorResponse::IncorrectlyFormed(format!(
            "Invalid {field_name}. Expected an RFC 3339 datetime or a YYYY-MM-DD date",
        ))
    })
}
