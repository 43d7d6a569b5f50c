use subtrack_common::db::{self, DbThreadPool};
use subtrack_common::models::subscription::Category;
use subtrack_common::reconcile::{self, CandidateMatch, ExistingSubscription};
use subtrack_common::request_io::{
    InputImportCandidates, OutputReconciledCandidate, OutputReconciledCandidates,
};

use actix_web::{web, HttpResponse};

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeader;

const MAX_CANDIDATES_PER_BATCH: usize = 100;

/// Classifies a batch of AI-extracted candidates against the user's existing
/// subscriptions. Nothing is persisted; the client decides what to do with
/// each classification.
pub async fn reconcile(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    candidates: web::Json<InputImportCandidates>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let candidates = candidates.into_inner().candidates;
    let user_id = user_access_token.claims.user_id;

    if candidates.len() > MAX_CANDIDATES_PER_BATCH {
        return Err(HttpErrorResponse::TooManyRequested(format!(
            "Too many candidates in one batch. Max: {MAX_CANDIDATES_PER_BATCH}",
        )));
    }

    let existing = match web::block(move || {
        let mut subscription_dao = db::subscription::Dao::new(&db_thread_pool);
        subscription_dao.get_owned_subscriptions(user_id)
    })
    .await?
    {
        Ok(subscriptions) => subscriptions
            .iter()
            .map(ExistingSubscription::from)
            .collect::<Vec<_>>(),
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get subscriptions",
            )));
        }
    };

    let reconciled = candidates
        .into_iter()
        .map(|candidate| {
            let classification =
                reconcile::classify_candidate(&candidate.service_name, candidate.amount, &existing);

            let category = candidate
                .category
                .as_deref()
                .map(Category::from_name_lenient)
                .unwrap_or(Category::Other);

            let new_amount_cents = (candidate.amount * 100.0).round() as i64;

            let (is_existing, price_changed, existing_id, existing_amount_cents) =
                match classification {
                    CandidateMatch::New => (false, false, None, None),
                    CandidateMatch::Unchanged { existing_id } => {
                        (true, false, Some(existing_id), None)
                    }
                    CandidateMatch::PriceChanged {
                        existing_id,
                        existing_amount_cents,
                        ..
                    } => (true, true, Some(existing_id), Some(existing_amount_cents)),
                };

            OutputReconciledCandidate {
                service_name: candidate.service_name,
                amount: candidate.amount,
                currency: candidate.currency,
                billing_cycle: candidate.billing_cycle,
                renewal_date: candidate.renewal_date,
                category,
                is_existing,
                price_changed,
                existing_id,
                existing_amount_cents,
                new_amount_cents,
            }
        })
        .collect::<Vec<_>>();

    Ok(HttpResponse::Ok().json(OutputReconciledCandidates {
        candidates: reconciled,
    }))
}
