use subtrack_common::token::auth_token::{AuthToken, AuthTokenClaims, AuthTokenType};
use subtrack_common::token::{DecodedToken, Token, TokenError};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use futures::future;
use std::marker::PhantomData;
use std::time::Duration;

use crate::env;
use crate::handlers::error::HttpErrorResponse;
use crate::middleware::{into_actix_error_res, TokenLocation};

pub trait RequestAuthTokenType {
    fn token_name() -> &'static str;
    fn token_type() -> AuthTokenType;
    #[allow(dead_code)]
    fn token_lifetime() -> Duration;
}

pub struct Access {}
pub struct Refresh {}

impl RequestAuthTokenType for Access {
    fn token_name() -> &'static str {
        "AccessToken"
    }
    fn token_type() -> AuthTokenType {
        AuthTokenType::Access
    }
    fn token_lifetime() -> Duration {
        env::CONF.access_token_lifetime
    }
}

impl RequestAuthTokenType for Refresh {
    fn token_name() -> &'static str {
        "RefreshToken"
    }
    fn token_type() -> AuthTokenType {
        AuthTokenType::Refresh
    }
    fn token_lifetime() -> Duration {
        env::CONF.refresh_token_lifetime
    }
}

type AuthDecodedToken = DecodedToken<<AuthToken as Token>::Claims, <AuthToken as Token>::Verifier>;

#[derive(Debug)]
pub struct UnverifiedToken<T: RequestAuthTokenType, L: TokenLocation> {
    pub decoded: AuthDecodedToken,
    _marker: PhantomData<(T, L)>,
}

impl<T, L> UnverifiedToken<T, L>
where
    T: RequestAuthTokenType,
    L: TokenLocation,
{
    pub fn verify(&self) -> Result<AuthTokenClaims, TokenError> {
        verify_token(&self.decoded, T::token_type())
    }
}

impl<T, L> FromRequest for UnverifiedToken<T, L>
where
    T: RequestAuthTokenType,
    L: TokenLocation,
{
    type Error = HttpErrorResponse;
    type Future = future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match into_actix_error_res(get_and_decode_token::<T, L>(req)) {
            Ok(decoded) => future::ok(UnverifiedToken {
                decoded,
                _marker: PhantomData,
            }),
            Err(e) => future::err(e),
        }
    }
}

#[derive(Debug)]
pub struct VerifiedToken<T: RequestAuthTokenType, L: TokenLocation> {
    pub claims: AuthTokenClaims,
    _marker: PhantomData<(T, L)>,
}

impl<T, L> FromRequest for VerifiedToken<T, L>
where
    T: RequestAuthTokenType,
    L: TokenLocation,
{
    type Error = HttpErrorResponse;
    type Future = future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let decoded_token = match into_actix_error_res(get_and_decode_token::<T, L>(req)) {
            Ok(t) => t,
            Err(e) => return future::err(e),
        };

        let claims = match into_actix_error_res(verify_token(&decoded_token, T::token_type())) {
            Ok(c) => c,
            Err(e) => return future::err(e),
        };

        future::ok(VerifiedToken {
            claims,
            _marker: PhantomData,
        })
    }
}

#[inline]
fn get_and_decode_token<T, L>(req: &HttpRequest) -> Result<AuthDecodedToken, TokenError>
where
    T: RequestAuthTokenType,
    L: TokenLocation,
{
    let token = match L::get_from_request(req, T::token_name()) {
        Some(h) => h,
        None => return Err(TokenError::TokenMissing),
    };

    AuthToken::decode(token)
}

#[inline]
fn verify_token(
    decoded_token: &AuthDecodedToken,
    expected_type: AuthTokenType,
) -> Result<AuthTokenClaims, TokenError> {
    let claims = decoded_token.verify(&env::CONF.token_signing_key)?;

    if claims.token_type != expected_type {
        return Err(TokenError::WrongTokenType);
    }

    Ok(claims.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::dev::Payload;
    use actix_web::test::TestRequest;
    use std::time::{SystemTime, UNIX_EPOCH};
    use uuid::Uuid;

    use subtrack_common::token::auth_token::NewAuthTokenClaims;

    use crate::middleware::{FromHeader, FromQuery};

    fn signed_token(token_type: AuthTokenType, expires_in: i64) -> String {
        let exp = if expires_in >= 0 {
            SystemTime::now() + Duration::from_secs(expires_in as u64)
        } else {
            SystemTime::now() - Duration::from_secs((-expires_in) as u64)
        };

        let claims = NewAuthTokenClaims {
            user_id: Uuid::now_v7(),
            user_email: "test1234@example.com",
            expiration: exp.duration_since(UNIX_EPOCH).unwrap().as_secs(),
            token_type,
        };

        AuthToken::sign_new(claims, &env::CONF.token_signing_key)
    }

    #[actix_web::test]
    async fn test_verified_from_header() {
        let token = signed_token(AuthTokenType::Access, 10);

        let req = TestRequest::default()
            .insert_header(("AccessToken", token.as_str()))
            .to_http_request();

        assert!(
            VerifiedToken::<Access, FromHeader>::from_request(&req, &mut Payload::None)
                .await
                .is_ok()
        );
        assert!(
            VerifiedToken::<Access, FromQuery>::from_request(&req, &mut Payload::None)
                .await
                .is_err()
        );
        assert!(
            VerifiedToken::<Refresh, FromHeader>::from_request(&req, &mut Payload::None)
                .await
                .is_err()
        );

        let refresh_token = signed_token(AuthTokenType::Refresh, 10);

        let req = TestRequest::default()
            .insert_header(("AccessToken", refresh_token.as_str()))
            .to_http_request();

        assert!(
            VerifiedToken::<Access, FromHeader>::from_request(&req, &mut Payload::None)
                .await
                .is_err()
        );

        let expired_token = signed_token(AuthTokenType::Access, -10);

        let req = TestRequest::default()
            .insert_header(("AccessToken", expired_token.as_str()))
            .to_http_request();

        assert!(
            VerifiedToken::<Access, FromHeader>::from_request(&req, &mut Payload::None)
                .await
                .is_err()
        );

        let req = TestRequest::default().to_http_request();

        assert!(
            VerifiedToken::<Access, FromHeader>::from_request(&req, &mut Payload::None)
                .await
                .is_err()
        );
    }

    #[actix_web::test]
    async fn test_verified_from_query() {
        let token = signed_token(AuthTokenType::Access, 10);

        let req = TestRequest::default()
            .uri(&format!("/test?AccessToken={}", &token))
            .to_http_request();

        assert!(
            VerifiedToken::<Access, FromQuery>::from_request(&req, &mut Payload::None)
                .await
                .is_ok()
        );
        assert!(
            VerifiedToken::<Access, FromHeader>::from_request(&req, &mut Payload::None)
                .await
                .is_err()
        );
        assert!(
            VerifiedToken::<Refresh, FromQuery>::from_request(&req, &mut Payload::None)
                .await
                .is_err()
        );
    }

    #[actix_web::test]
    async fn test_unverified_token_defers_verification() {
        let refresh_token = signed_token(AuthTokenType::Refresh, 10);

        let req = TestRequest::default()
            .insert_header(("RefreshToken", refresh_token.as_str()))
            .to_http_request();

        let unverified =
            UnverifiedToken::<Refresh, FromHeader>::from_request(&req, &mut Payload::None)
                .await
                .unwrap();
        assert!(unverified.verify().is_ok());

        // Wrong type decodes fine but fails verification
        let req = TestRequest::default()
            .insert_header(("AccessToken", refresh_token.as_str()))
            .to_http_request();

        let unverified =
            UnverifiedToken::<Access, FromHeader>::from_request(&req, &mut Payload::None)
                .await
                .unwrap();
        assert!(unverified.verify().is_err());

        let expired_token = signed_token(AuthTokenType::Refresh, -10);

        let req = TestRequest::default()
            .insert_header(("RefreshToken", expired_token.as_str()))
            .to_http_request();

        let unverified =
            UnverifiedToken::<Refresh, FromHeader>::from_request(&req, &mut Payload::None)
                .await
                .unwrap();
        assert!(unverified.verify().is_err());

        let req = TestRequest::default().to_http_request();

        assert!(
            UnverifiedToken::<Refresh, FromHeader>::from_request(&req, &mut Payload::None)
                .await
                .is_err()
        );
    }
}
