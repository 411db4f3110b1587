pub mod auth_token;

use base64::engine::general_purpose::URL_SAFE as b64_urlsafe;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_LENGTH: usize = 32;
const MAX_TOKEN_LENGTH: usize = 8192;

#[derive(Debug, PartialEq, Eq)]
pub enum TokenError {
    TokenInvalid,
    TokenExpired,
    TokenMissing,
    WrongTokenType,
    SigningFailed,
}

impl std::error::Error for TokenError {}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::TokenInvalid => write!(f, "TokenInvalid"),
            TokenError::TokenExpired => write!(f, "TokenExpired"),
            TokenError::TokenMissing => write!(f, "TokenMissing"),
            TokenError::WrongTokenType => write!(f, "WrongTokenType"),
            TokenError::SigningFailed => write!(f, "SigningFailed"),
        }
    }
}

pub trait Expiring {
    /// Seconds since the Unix epoch.
    fn expiration(&self) -> i64;
}

/// A token whose claims have been parsed but whose signature has not been checked yet.
#[derive(Debug)]
pub struct DecodedToken<C>
where
    C: Expiring + DeserializeOwned,
{
    pub json: Vec<u8>,
    pub signature: Vec<u8>,
    pub claims: C,
}

impl<C> DecodedToken<C>
where
    C: Expiring + DeserializeOwned,
{
    pub fn verify(&self, key: &[u8]) -> Result<&C, TokenError> {
        let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
            return Err(TokenError::TokenInvalid);
        };

        mac.update(&self.json);

        // Constant-time comparison
        if mac.verify_slice(&self.signature).is_err() {
            return Err(TokenError::TokenInvalid);
        }

        if self.claims.expiration() <= Utc::now().timestamp() {
            return Err(TokenError::TokenExpired);
        }

        Ok(&self.claims)
    }
}

/// Wire format: base64url(`json claims` ++ `HMAC-SHA256(json claims)`).
pub trait Token {
    type Claims: Expiring + DeserializeOwned;

    fn token_name() -> &'static str;

    fn decode(token: &str) -> Result<DecodedToken<Self::Claims>, TokenError> {
        if token.len() > MAX_TOKEN_LENGTH {
            return Err(TokenError::TokenInvalid);
        }

        let decoded_token = b64_urlsafe
            .decode(token)
            .map_err(|_| TokenError::TokenInvalid)?;

        if decoded_token.len() <= SIGNATURE_LENGTH {
            return Err(TokenError::TokenInvalid);
        }

        let (json, signature) = decoded_token.split_at(decoded_token.len() - SIGNATURE_LENGTH);
        let claims: Self::Claims =
            serde_json::from_slice(json).map_err(|_| TokenError::TokenInvalid)?;

        Ok(DecodedToken {
            json: Vec::from(json),
            signature: Vec::from(signature),
            claims,
        })
    }
}

pub fn sign<C: Serialize>(claims: &C, signing_key: &[u8]) -> Result<String, TokenError> {
    let mut token_unencoded = serde_json::to_vec(claims).map_err(|_| TokenError::SigningFailed)?;

    let mut mac =
        HmacSha256::new_from_slice(signing_key).map_err(|_| TokenError::SigningFailed)?;
    mac.update(&token_unencoded);
    token_unencoded.extend_from_slice(&mac.finalize().into_bytes());

    Ok(b64_urlsafe.encode(&token_unencoded))
}
