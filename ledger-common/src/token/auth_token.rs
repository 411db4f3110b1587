use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::token::{self, Expiring, Token, TokenError};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthTokenType {
    Access,
    Refresh,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthTokenClaims {
    #[serde(rename = "uid")]
    pub user_id: Uuid,
    #[serde(rename = "eml")]
    pub user_email: String,
    #[serde(rename = "exp")]
    pub expiration: i64,
    #[serde(rename = "typ")]
    pub token_type: AuthTokenType,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewAuthTokenClaims<'a> {
    #[serde(rename = "uid")]
    pub user_id: Uuid,
    #[serde(rename = "eml")]
    pub user_email: &'a str,
    #[serde(rename = "exp")]
    pub expiration: i64,
    #[serde(rename = "typ")]
    pub token_type: AuthTokenType,
}

impl<'a> NewAuthTokenClaims<'a> {
    pub fn expiring_after(
        user_id: Uuid,
        user_email: &'a str,
        token_type: AuthTokenType,
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self {
        Self {
            user_id,
            user_email,
            expiration: (now + lifetime).timestamp(),
            token_type,
        }
    }
}

impl Expiring for AuthTokenClaims {
    fn expiration(&self) -> i64 {
        self.expiration
    }
}

pub struct AuthToken {}

impl AuthToken {
    pub fn sign_new(claims: &NewAuthTokenClaims, signing_key: &[u8]) -> Result<String, TokenError> {
        token::sign(claims, signing_key)
    }
}

impl Token for AuthToken {
    type Claims = AuthTokenClaims;

    fn token_name() -> &'static str {
        "AuthToken"
    }
}
