use crate::token::{Expiring, HmacSha256Verifier, Token};

use base64::engine::general_purpose::URL_SAFE as b64_urlsafe;
use base64::Engine;
use hmac::Mac;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::HmacSha256;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HouseholdInviteTokenClaims {
    #[serde(rename = "hid")]
    pub household_id: Uuid,
    #[serde(rename = "eml")]
    pub invited_email: String,
    #[serde(rename = "exp")]
    pub expiration: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewHouseholdInviteTokenClaims<'a> {
    #[serde(rename = "hid")]
    pub household_id: Uuid,
    #[serde(rename = "eml")]
    pub invited_email: &'a str,
    #[serde(rename = "exp")]
    pub expiration: u64,
}

impl Expiring for HouseholdInviteTokenClaims {
    fn expiration(&self) -> u64 {
        self.expiration
    }
}

/// Stateless invite carried in an emailed link. The claims bind the invite
/// to both the household and the invited address.
pub struct HouseholdInviteToken {}

impl HouseholdInviteToken {
    pub fn sign_new(claims: NewHouseholdInviteTokenClaims, signing_key: &[u8]) -> String {
        let mut token_unencoded =
            serde_json::to_vec(&claims).expect("Failed to transform claims into JSON");

        let mut mac = HmacSha256::new_from_slice(signing_key).expect("HMAC key should not fail");
        mac.update(&token_unencoded);
        let signature = mac.finalize();
        token_unencoded.extend_from_slice(&signature.into_bytes());

        b64_urlsafe.encode(&token_unencoded)
    }
}

impl Token for HouseholdInviteToken {
    type Claims = HouseholdInviteTokenClaims;
    type Verifier = HmacSha256Verifier;

    fn token_name() -> &'static str {
        "HouseholdInviteToken"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    #[test]
    fn test_sign_and_verify() {
        let household_id = Uuid::now_v7();
        let invited_email = "invitee@example.com";
        let exp = (SystemTime::now() + Duration::from_secs(7 * 86400))
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let signing_key = [7; 64];

        let claims = NewHouseholdInviteTokenClaims {
            household_id,
            invited_email,
            expiration: exp,
        };

        let token = HouseholdInviteToken::sign_new(claims, &signing_key);
        let t = HouseholdInviteToken::decode(&token).unwrap();
        let claims = t.verify(&signing_key).unwrap();

        assert_eq!(claims.household_id, household_id);
        assert_eq!(claims.invited_email, invited_email);
        assert_eq!(claims.expiration, exp);

        assert!(HouseholdInviteToken::decode(&token)
            .unwrap()
            .verify(&[8; 64])
            .is_err());
    }

    #[test]
    fn test_expired_invite_is_rejected() {
        let exp = (SystemTime::now() - Duration::from_secs(10))
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        let claims = NewHouseholdInviteTokenClaims {
            household_id: Uuid::now_v7(),
            invited_email: "invitee@example.com",
            expiration: exp,
        };

        let token = HouseholdInviteToken::sign_new(claims, &[7; 64]);
        assert!(HouseholdInviteToken::decode(&token)
            .unwrap()
            .verify(&[7; 64])
            .is_err());
    }
}
