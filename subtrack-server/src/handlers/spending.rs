use subtrack_common::db::{self, DbThreadPool};
use subtrack_common::rates::{RateCache, BASE_CURRENCY};
use subtrack_common::request_io::{
    OutputCategoryBreakdown, OutputCategoryTotal, OutputExchangeRates, OutputMonthTotal,
    OutputSpendingHistory,
};
use subtrack_common::spending::{self, AmountChange, SpendRecord};

use actix_web::{web, HttpResponse};
use chrono::Utc;

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeader;

const HISTORY_MONTH_COUNT: u32 = 6;

pub async fn history(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let (subscriptions, amount_changes) = match web::block(move || {
        let mut subscription_dao = db::subscription::Dao::new(&db_thread_pool);
        let subscriptions = subscription_dao.get_owned_subscriptions(user_id)?;
        let amount_changes = subscription_dao.get_amount_changes_for_user(user_id)?;

        Ok::<_, db::DaoError>((subscriptions, amount_changes))
    })
    .await?
    {
        Ok(data) => data,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get spending history",
            )));
        }
    };

    let records = subscriptions.iter().map(SpendRecord::from).collect::<Vec<_>>();
    let changes = amount_changes
        .iter()
        .map(AmountChange::from)
        .collect::<Vec<_>>();

    let months = spending::trailing_months(Utc::now(), HISTORY_MONTH_COUNT);
    let totals = spending::monthly_totals(&records, &changes, &months);
    let change_from_previous_month = spending::change_from_previous_month(&totals);

    Ok(HttpResponse::Ok().json(OutputSpendingHistory {
        months: totals
            .into_iter()
            .map(|t| OutputMonthTotal {
                label: t.label,
                total_cents: t.total_cents,
            })
            .collect(),
        change_from_previous_month,
    }))
}

pub async fn categories(
    db_thread_pool: web::Data<DbThreadPool>,
    rate_cache: web::Data<RateCache>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let (user, subscriptions) = match web::block(move || {
        let mut user_dao = db::user::Dao::new(&db_thread_pool);
        let user = user_dao.get_user_by_id(user_id)?;

        let mut subscription_dao = db::subscription::Dao::new(&db_thread_pool);
        let subscriptions = subscription_dao.get_owned_subscriptions(user_id)?;

        Ok::<_, db::DaoError>((user, subscriptions))
    })
    .await?
    {
        Ok(data) => data,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get category breakdown",
            )));
        }
    };

    let rates = rate_cache.current().await;
    let breakdown = spending::category_breakdown(&subscriptions, &rates, &user.display_currency);

    let categories = breakdown
        .into_iter()
        .map(|(category, total_cents)| OutputCategoryTotal {
            category,
            total_cents,
        })
        .collect::<Vec<_>>();
    let total_monthly_cents = categories.iter().map(|c| c.total_cents).sum();

    Ok(HttpResponse::Ok().json(OutputCategoryBreakdown {
        display_currency: user.display_currency,
        rates_fallback: rates.fallback,
        total_monthly_cents,
        categories,
    }))
}

pub async fn rates(
    rate_cache: web::Data<RateCache>,
    _user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let rates = rate_cache.current().await;

    Ok(HttpResponse::Ok().json(OutputExchangeRates {
        base: String::from(BASE_CURRENCY),
        rates: rates.rates,
        fallback: rates.fallback,
    }))
}
