use subtrack_common::db::{self, DaoError, DbThreadPool};
use subtrack_common::request_io::{InputCredentials, InputUser, TokenPair};
use subtrack_common::token::auth_token::{AuthToken, AuthTokenType, NewAuthTokenClaims};
use subtrack_common::validators::{self, Validity};

use actix_web::{web, HttpResponse};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::env;
use crate::handlers::error::HttpErrorResponse;
use crate::middleware::auth::{Refresh, UnverifiedToken};
use crate::middleware::FromHeader;

const MAX_PASSWORD_LENGTH: usize = 512;
const MIN_PASSWORD_LENGTH: usize = 8;

pub async fn register(
    db_thread_pool: web::Data<DbThreadPool>,
    user_data: web::Json<InputUser>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_data = user_data.into_inner();

    if let Validity::Invalid(msg) = validators::validate_email_address(&user_data.email) {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    if user_data.password.len() > MAX_PASSWORD_LENGTH {
        return Err(HttpErrorResponse::InputTooLarge(format!(
            "Provided password is too long. Max: {MAX_PASSWORD_LENGTH} bytes",
        )));
    }

    if user_data.password.len() < MIN_PASSWORD_LENGTH {
        return Err(HttpErrorResponse::IncorrectlyFormed(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters",
        )));
    }

    let display_currency = user_data
        .display_currency
        .clone()
        .unwrap_or(String::from("USD"));

    if let Validity::Invalid(msg) = validators::validate_currency_code(&display_currency) {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let password = user_data.password.clone();
    let (sender, receiver) = oneshot::channel();

    rayon::spawn(move || {
        let hash_result = argon2_kdf::Hasher::default()
            .algorithm(argon2_kdf::Algorithm::Argon2id)
            .salt_length(env::CONF.hash_salt_length)
            .hash_length(env::CONF.hash_length)
            .iterations(env::CONF.hash_iterations)
            .memory_cost_kib(env::CONF.hash_mem_cost_kib)
            .threads(env::CONF.hash_threads)
            .secret(argon2_kdf::Secret::using_bytes(&env::CONF.hashing_key))
            .hash(password.as_bytes());

        sender.send(hash_result).expect("Sending to channel failed");
    });

    let auth_string_hash = match receiver.await? {
        Ok(hash) => hash.to_string(),
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to hash password",
            )));
        }
    };

    let user = match web::block(move || {
        let mut user_dao = db::user::Dao::new(&db_thread_pool);
        user_dao.create_user(&user_data.email, &auth_string_hash, &display_currency)
    })
    .await?
    {
        Ok(u) => u,
        Err(DaoError::QueryFailure(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        ))) => {
            return Err(HttpErrorResponse::ConflictWithExisting(String::from(
                "A user with this email address already exists",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to create user",
            )));
        }
    };

    Ok(HttpResponse::Created().json(generate_token_pair(user.id, &user.email)))
}

pub async fn sign_in(
    db_thread_pool: web::Data<DbThreadPool>,
    credentials: web::Json<InputCredentials>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let credentials = credentials.into_inner();

    if let Validity::Invalid(msg) = validators::validate_email_address(&credentials.email) {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    if credentials.password.len() > MAX_PASSWORD_LENGTH {
        return Err(HttpErrorResponse::InputTooLarge(format!(
            "Provided password is too long. Max: {MAX_PASSWORD_LENGTH} bytes",
        )));
    }

    let email = credentials.email.clone();
    let user = match web::block(move || {
        let mut user_dao = db::user::Dao::new(&db_thread_pool);
        user_dao.get_user_by_email(&email)
    })
    .await?
    {
        Ok(u) => u,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            // Indistinguishable from a wrong password so account existence
            // isn't leaked
            return Err(HttpErrorResponse::IncorrectCredential(String::from(
                "Incorrect email address or password",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get user auth string hash",
            )));
        }
    };

    let auth_string_hash = user.auth_string_hash.clone();
    let password = credentials.password;
    let (sender, receiver) = oneshot::channel();

    rayon::spawn(move || {
        let hash = match argon2_kdf::Hash::from_str(&auth_string_hash) {
            Ok(h) => h,
            Err(e) => {
                sender.send(Err(e)).expect("Sending to channel failed");
                return;
            }
        };

        let does_password_match_hash = hash.verify_with_secret(
            password.as_bytes(),
            argon2_kdf::Secret::using_bytes(&env::CONF.hashing_key),
        );

        sender
            .send(Ok(does_password_match_hash))
            .expect("Sending to channel failed");
    });

    match receiver.await? {
        Ok(true) => (),
        Ok(false) => {
            return Err(HttpErrorResponse::IncorrectCredential(String::from(
                "Incorrect email address or password",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to validate password",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(generate_token_pair(user.id, &user.email)))
}

pub async fn refresh_tokens(
    token: UnverifiedToken<Refresh, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let claims = token.verify()?;

    Ok(HttpResponse::Ok().json(generate_token_pair(claims.user_id, &claims.user_email)))
}

fn generate_token_pair(user_id: Uuid, user_email: &str) -> TokenPair {
    let now = SystemTime::now();

    let access_expiration = (now + env::CONF.access_token_lifetime)
        .duration_since(UNIX_EPOCH)
        .expect("Failed to fetch system time")
        .as_secs();
    let refresh_expiration = (now + env::CONF.refresh_token_lifetime)
        .duration_since(UNIX_EPOCH)
        .expect("Failed to fetch system time")
        .as_secs();

    let access_token = AuthToken::sign_new(
        NewAuthTokenClaims {
            user_id,
            user_email,
            expiration: access_expiration,
            token_type: AuthTokenType::Access,
        },
        &env::CONF.token_signing_key,
    );

    let refresh_token = AuthToken::sign_new(
        NewAuthTokenClaims {
            user_id,
            user_email,
            expiration: refresh_expiration,
            token_type: AuthTokenType::Refresh,
        },
        &env::CONF.token_signing_key,
    );

    TokenPair {
        access_token,
        refresh_token,
        server_time: now
            .duration_since(UNIX_EPOCH)
            .expect("Failed to fetch system time")
            .as_millis(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use subtrack_common::token::Token;

    #[test]
    fn test_generate_token_pair() {
        let user_id = Uuid::now_v7();
        let pair = generate_token_pair(user_id, "test1234@example.com");

        let access = AuthToken::decode(&pair.access_token).unwrap();
        let access_claims = access.verify(&env::CONF.token_signing_key).unwrap();
        assert_eq!(access_claims.user_id, user_id);
        assert_eq!(access_claims.token_type, AuthTokenType::Access);

        let refresh = AuthToken::decode(&pair.refresh_token).unwrap();
        let refresh_claims = refresh.verify(&env::CONF.token_signing_key).unwrap();
        assert_eq!(refresh_claims.user_id, user_id);
        assert_eq!(refresh_claims.token_type, AuthTokenType::Refresh);

        assert!(refresh_claims.expiration > access_claims.expiration);
    }
}
