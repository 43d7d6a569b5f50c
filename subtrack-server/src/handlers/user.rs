use subtrack_common::db::user::UserPrefsChangeset;
use subtrack_common::db::{self, DaoError, DbThreadPool};
use subtrack_common::request_io::{InputUserPrefs, OutputUser};
use subtrack_common::validators::{self, Validity};

use actix_web::{web, HttpResponse};

use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeader;

pub async fn get(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let user = match web::block(move || {
        let mut user_dao = db::user::Dao::new(&db_thread_pool);
        user_dao.get_user_by_id(user_id)
    })
    .await?
    {
        Ok(u) => u,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("No user with provided ID"),
                DoesNotExistType::User,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get user data",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(OutputUser::from(user)))
}

pub async fn edit_prefs(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    prefs: web::Json<InputUserPrefs>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let prefs = prefs.into_inner();

    if prefs.display_currency.is_none() && prefs.email_reminders_enabled.is_none() {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "No preferences were provided",
        )));
    }

    if let Some(ref currency) = prefs.display_currency {
        if let Validity::Invalid(msg) = validators::validate_currency_code(currency) {
            return Err(HttpErrorResponse::IncorrectlyFormed(msg));
        }
    }

    let user_id = user_access_token.claims.user_id;

    let user = match web::block(move || {
        let mut user_dao = db::user::Dao::new(&db_thread_pool);
        user_dao.update_user_prefs(
            user_id,
            UserPrefsChangeset {
                display_currency: prefs.display_currency.as_deref(),
                email_reminders_enabled: prefs.email_reminders_enabled,
            },
        )
    })
    .await?
    {
        Ok(u) => u,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("No user with provided ID"),
                DoesNotExistType::User,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to update user preferences",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(OutputUser::from(user)))
}
