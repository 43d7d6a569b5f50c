use subtrack_common::db::{self, DaoError, DbThreadPool};
use subtrack_common::email::templates::HouseholdInviteMessage;
use subtrack_common::email::{EmailMessage, SendEmail};
use subtrack_common::models::household_member::HouseholdRole;
use subtrack_common::request_io::{
    InputEmailAddress, InputHousehold, InputInviteToken, OutputHousehold, OutputHouseholdMember,
};
use subtrack_common::token::household_invite_token::{
    HouseholdInviteToken, NewHouseholdInviteTokenClaims,
};
use subtrack_common::token::Token;
use subtrack_common::validators::{self, Validity};

use actix_web::{web, HttpResponse};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::env;
use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeader;

const MAX_HOUSEHOLD_NAME_LENGTH: usize = 80;

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    household_data: web::Json<InputHousehold>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let household_data = household_data.into_inner();
    let user_id = user_access_token.claims.user_id;

    if household_data.name.trim().is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "Household name cannot be empty",
        )));
    }

    if household_data.name.len() > MAX_HOUSEHOLD_NAME_LENGTH {
        return Err(HttpErrorResponse::InputTooLarge(format!(
            "Household name is too long. Max: {MAX_HOUSEHOLD_NAME_LENGTH} bytes",
        )));
    }

    let household = match web::block(move || {
        let mut household_dao = db::household::Dao::new(&db_thread_pool);
        household_dao.create_household(household_data.name.trim(), user_id)
    })
    .await?
    {
        Ok(h) => h,
        Err(DaoError::WontRunQuery) => {
            return Err(HttpErrorResponse::ConflictWithExisting(String::from(
                "User already belongs to a household",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to create household",
            )));
        }
    };

    let members = vec![OutputHouseholdMember {
        user_id,
        email: user_access_token.claims.user_email.clone(),
        role: HouseholdRole::Owner,
    }];

    Ok(HttpResponse::Created().json(OutputHousehold::from_household(household, members)))
}

pub async fn get(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let (household, members) = match web::block(move || {
        let mut household_dao = db::household::Dao::new(&db_thread_pool);
        household_dao.get_household_for_user(user_id)
    })
    .await?
    {
        Ok(data) => data,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("User does not belong to a household"),
                DoesNotExistType::Household,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get household",
            )));
        }
    };

    let members = members
        .into_iter()
        .map(|(member, email)| OutputHouseholdMember {
            user_id: member.user_id,
            email,
            role: member.role,
        })
        .collect::<Vec<_>>();

    Ok(HttpResponse::Ok().json(OutputHousehold::from_household(household, members)))
}

pub async fn invite(
    db_thread_pool: web::Data<DbThreadPool>,
    smtp_thread_pool: web::Data<Arc<Box<dyn SendEmail>>>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    invitation: web::Json<InputEmailAddress>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let invitation = invitation.into_inner();
    let user_id = user_access_token.claims.user_id;

    if let Validity::Invalid(msg) = validators::validate_email_address(&invitation.email) {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let household = match web::block(move || {
        let mut user_dao = db::user::Dao::new(&db_thread_pool);
        let user = user_dao.get_user_by_id(user_id)?;

        let Some(household_id) = user.household_id else {
            return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
        };

        let mut household_dao = db::household::Dao::new(&db_thread_pool);
        household_dao.get_household(household_id)
    })
    .await?
    {
        Ok(h) => h,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("User does not belong to a household"),
                DoesNotExistType::Household,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get household",
            )));
        }
    };

    // Only the household owner can extend invitations
    if household.owner_user_id != user_id {
        return Err(HttpErrorResponse::UserDisallowed(String::from(
            "Only the household owner can invite new members",
        )));
    }

    let expiration = (SystemTime::now() + env::CONF.household_invite_lifetime)
        .duration_since(UNIX_EPOCH)
        .expect("Failed to fetch system time")
        .as_secs();

    let invite_token = HouseholdInviteToken::sign_new(
        NewHouseholdInviteTokenClaims {
            household_id: household.id,
            invited_email: &invitation.email,
            expiration,
        },
        &env::CONF.token_signing_key,
    );

    let accept_url = format!("{}?token={}", env::CONF.household_accept_url, invite_token);
    let message_body = HouseholdInviteMessage::generate(
        &household.name,
        &accept_url,
        env::CONF.household_invite_lifetime,
    );

    let message = EmailMessage {
        body: message_body,
        subject: "You've been invited to a household",
        from: env::CONF.email_from_address.clone(),
        reply_to: env::CONF.email_reply_to_address.clone(),
        destination: &invitation.email,
        is_html: true,
    };

    match smtp_thread_pool.send(message).await {
        Ok(()) => (),
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to send invitation email",
            )));
        }
    };

    Ok(HttpResponse::Ok().finish())
}

pub async fn accept_invitation(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    invite_token: web::Json<InputInviteToken>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let decoded = match HouseholdInviteToken::decode(&invite_token.token) {
        Ok(t) => t,
        Err(_) => {
            return Err(HttpErrorResponse::BadToken(String::from(
                "Invalid invitation token",
            )));
        }
    };

    let claims = match decoded.verify(&env::CONF.token_signing_key) {
        Ok(c) => c,
        Err(_) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("Invitation is invalid or has expired"),
                DoesNotExistType::Invitation,
            ));
        }
    };

    // The invite is bound to the address it was sent to
    if !claims
        .invited_email
        .eq_ignore_ascii_case(&user_access_token.claims.user_email)
    {
        return Err(HttpErrorResponse::UserDisallowed(String::from(
            "Invitation was issued to a different email address",
        )));
    }

    let household_id = claims.household_id;

    match web::block(move || {
        let mut household_dao = db::household::Dao::new(&db_thread_pool);
        household_dao.add_member(household_id, user_id)
    })
    .await?
    {
        Ok(()) => (),
        Err(DaoError::WontRunQuery) => {
            return Err(HttpErrorResponse::ConflictWithExisting(String::from(
                "User already belongs to a different household",
            )));
        }
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("Household no longer exists"),
                DoesNotExistType::Household,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to join household",
            )));
        }
    };

    Ok(HttpResponse::Ok().finish())
}

pub async fn leave(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    match web::block(move || {
        let mut household_dao = db::household::Dao::new(&db_thread_pool);
        household_dao.leave_household(user_id)
    })
    .await?
    {
        Ok(()) => (),
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("User does not belong to a household"),
                DoesNotExistType::Household,
            ));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to leave household",
            )));
        }
    };

    Ok(HttpResponse::Ok().finish())
}
