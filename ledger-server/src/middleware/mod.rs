pub mod auth;
pub mod cors;

mod limiter;

pub use limiter::Limiter;

use ledger_common::token::TokenError;

use actix_web::http::header;
use actix_web::HttpRequest;

use crate::handlers::error::HttpErrorResponse;

pub trait TokenLocation {
    fn get_from_request<'a>(req: &'a HttpRequest, key: &str) -> Option<&'a str>;
}

/// `Authorization: Bearer <token>`. The key is ignored.
pub struct FromBearer {}

/// A request header named after the token.
pub struct FromHeader {}

impl TokenLocation for FromBearer {
    fn get_from_request<'a>(req: &'a HttpRequest, _key: &str) -> Option<&'a str> {
        let header = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = header.split_once(' ')?;

        if !scheme.eq_ignore_ascii_case("Bearer") {
            return None;
        }

        let token = token.trim();

        if token.is_empty() {
            return None;
        }

        Some(token)
    }
}

impl TokenLocation for FromHeader {
    fn get_from_request<'a>(req: &'a HttpRequest, key: &str) -> Option<&'a str> {
        let header = req.headers().get(key)?;
        header.to_str().ok()
    }
}

#[inline(always)]
fn into_actix_error_res<T>(result: Result<T, TokenError>) -> Result<T, HttpErrorResponse> {
    result.map_err(HttpErrorResponse::from)
}
