use ledger_common::db::Store;
use ledger_common::ledger::{self, LedgerError};
use ledger_common::models::user::User;
use ledger_common::request_io::{
    CredentialPair, InputUser, OutputAuth, OutputEnvelope, OutputUser, TokenPair,
};
use ledger_common::token::auth_token::{AuthToken, AuthTokenType, NewAuthTokenClaims};
use ledger_common::validators::{self, Validity};

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::env;
use crate::handlers::error::HttpErrorResponse;
use crate::middleware::auth::{Access, Refresh, RequestAuthTokenType, VerifiedToken};
use crate::middleware::{FromBearer, FromHeader};

const INCORRECT_CREDENTIALS_MSG: &str = "Invalid email or password";

/// Hash checked against when no user has the given email.
static DUMMY_PASSWORD_HASH: Lazy<Option<String>> = Lazy::new(|| {
    match password_hasher().hash(b"ledger-dummy-password") {
        Ok(h) => Some(h.to_string()),
        Err(e) => {
            log::error!("Failed to create dummy password hash: {e}");
            None
        }
    }
});

pub async fn sign_up(
    store: web::Data<dyn Store>,
    user_data: web::Json<InputUser>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_data = user_data.into_inner();

    if let Validity::Invalid(msg) = user_data.validate_email_address() {
        return Err(HttpErrorResponse::InvalidInput(msg.into_owned()));
    }

    validators::validate_name(&user_data.name)?;
    validators::validate_password(&user_data.password)?;

    let password = Zeroizing::new(user_data.password.clone());
    let password_hash = hash_password(password).await?;

    let store = store.into_inner();
    let user =
        web::block(move || ledger::register_user(&*store, &user_data, &password_hash, Utc::now()))
            .await??;

    log::info!("Created user {}", user.id);

    let tokens = generate_token_pair(&user, Utc::now())?;

    Ok(HttpResponse::Created().json(OutputEnvelope::new(OutputAuth {
        user: OutputUser::from(&user),
        tokens,
    })))
}

pub async fn log_in(
    store: web::Data<dyn Store>,
    credentials: web::Json<CredentialPair>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let credentials = credentials.into_inner();

    if credentials.email.is_empty() || credentials.password.is_empty() {
        return Err(HttpErrorResponse::InvalidInput(String::from(
            "Please provide an email and password",
        )));
    }

    if !credentials.validate_email_address().is_valid() {
        return Err(HttpErrorResponse::IncorrectCredential(String::from(
            INCORRECT_CREDENTIALS_MSG,
        )));
    }

    let email = credentials.email.clone();
    let store = store.into_inner();

    let user = match web::block(move || ledger::find_user_by_email(&*store, &email)).await? {
        Ok(u) => Some(u),
        Err(LedgerError::NotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };

    let password = Zeroizing::new(credentials.password);
    let password_hash = user.as_ref().map(|u| u.password_hash.clone());

    let (sender, receiver) = oneshot::channel();

    rayon::spawn(move || {
        // Unknown emails still pay for a full verification so response times don't reveal
        // which addresses are registered
        let password_hash = match password_hash
            .as_deref()
            .or_else(|| DUMMY_PASSWORD_HASH.as_deref())
        {
            Some(h) => h,
            None => {
                let _ = sender.send(Ok(false));
                return;
            }
        };

        let hash = match argon2_kdf::Hash::from_str(password_hash) {
            Ok(h) => h,
            Err(e) => {
                let _ = sender.send(Err(e));
                return;
            }
        };

        let does_password_match_hash = hash.verify_with_secret(
            password.as_bytes(),
            argon2_kdf::Secret::using_bytes(&env::CONF.hashing_key[..]),
        );

        let _ = sender.send(Ok(does_password_match_hash));
    });

    let user = match (receiver.await?, user) {
        (Ok(true), Some(user)) => user,
        (Ok(_), _) => {
            return Err(HttpErrorResponse::IncorrectCredential(String::from(
                INCORRECT_CREDENTIALS_MSG,
            )));
        }
        (Err(e), _) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to validate password",
            )));
        }
    };

    let tokens = generate_token_pair(&user, Utc::now())?;

    Ok(HttpResponse::Ok().json(OutputEnvelope::new(OutputAuth {
        user: OutputUser::from(&user),
        tokens,
    })))
}

pub async fn refresh_tokens(
    store: web::Data<dyn Store>,
    token: VerifiedToken<Refresh, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user = load_user(store, token.claims.user_id).await?;
    let tokens = generate_token_pair(&user, Utc::now())?;

    Ok(HttpResponse::Ok().json(OutputEnvelope::new(OutputAuth {
        user: OutputUser::from(&user),
        tokens,
    })))
}

pub async fn me(
    store: web::Data<dyn Store>,
    token: VerifiedToken<Access, FromBearer>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user = load_user(store, token.claims.user_id).await?;
    Ok(HttpResponse::Ok().json(OutputEnvelope::new(OutputUser::from(&user))))
}

async fn load_user(store: web::Data<dyn Store>, user_id: Uuid) -> Result<User, HttpErrorResponse> {
    let store = store.into_inner();

    match web::block(move || ledger::get_user(&*store, user_id)).await? {
        Ok(u) => Ok(u),
        // Token outlived its user
        Err(LedgerError::NotFound(_)) => Err(HttpErrorResponse::BadToken(String::from(
            "User no longer exists",
        ))),
        Err(e) => Err(e.into()),
    }
}

async fn hash_password(password: Zeroizing<String>) -> Result<String, HttpErrorResponse> {
    let (sender, receiver) = oneshot::channel();

    rayon::spawn(move || {
        let hash_result = password_hasher().hash(password.as_bytes());

        let _ = sender.send(hash_result.map(|h| h.to_string()));
    });

    match receiver.await? {
        Ok(h) => Ok(h),
        Err(e) => {
            log::error!("{e}");
            Err(HttpErrorResponse::InternalError(String::from(
                "Failed to hash password",
            )))
        }
    }
}

fn password_hasher() -> argon2_kdf::Hasher<'static> {
    argon2_kdf::Hasher::default()
        .algorithm(argon2_kdf::Algorithm::Argon2id)
        .salt_length(env::CONF.hash_salt_length)
        .hash_length(env::CONF.hash_length)
        .iterations(env::CONF.hash_iterations)
        .memory_cost_kib(env::CONF.hash_mem_cost_kib)
        .threads(env::CONF.hash_threads)
        .secret(argon2_kdf::Secret::using_bytes(&env::CONF.hashing_key[..]))
}

fn generate_token_pair(user: &User, now: DateTime<Utc>) -> Result<TokenPair, HttpErrorResponse> {
    let access_token = sign_token::<Access>(user, now)?;
    let refresh_token = sign_token::<Refresh>(user, now)?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        server_time: now.timestamp_millis(),
    })
}

fn sign_token<T: RequestAuthTokenType>(
    user: &User,
    now: DateTime<Utc>,
) -> Result<String, HttpErrorResponse> {
    let lifetime = lifetime_as_chrono(T::token_lifetime())?;
    let token_type: AuthTokenType = T::token_type();

    let claims = NewAuthTokenClaims::expiring_after(user.id, &user.email, token_type, now, lifetime);
    Ok(AuthToken::sign_new(&claims, &env::CONF.token_signing_key[..])?)
}

fn lifetime_as_chrono(lifetime: Duration) -> Result<chrono::Duration, HttpErrorResponse> {
    chrono::Duration::from_std(lifetime).map_err(|e| {
        log::error!("Token lifetime out of range: {e}");
        HttpErrorResponse::InternalError(String::from("Failed to generate token"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use ledger_common::db::UserStore;
    use ledger_common::request_io::{ErrorType, ServerErrorResponse};
    use ledger_common::token::Token;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::App;
    use serde_json::json;

    use crate::handlers::test_utils::{self, bearer};

    #[actix_web::test]
    async fn test_sign_up() {
        let store = test_utils::memory_store();
        let app =
            test::init_service(App::new().configure(test_utils::configure_app(store.clone())))
                .await;

        let before = Utc::now().timestamp_millis();
        let auth = test_utils::sign_up(&app, "Avery", "Avery@Example.com").await;

        assert_eq!(auth.user.name, "Avery");
        assert_eq!(auth.user.email, "avery@example.com");
        assert!(auth.tokens.server_time >= before);

        let access = AuthToken::decode(&auth.tokens.access_token).unwrap();
        let claims = access.verify(&env::CONF.token_signing_key[..]).unwrap();
        assert_eq!(claims.user_id, auth.user.id);
        assert_eq!(claims.token_type, AuthTokenType::Access);

        let refresh = AuthToken::decode(&auth.tokens.refresh_token).unwrap();
        let claims = refresh.verify(&env::CONF.token_signing_key[..]).unwrap();
        assert_eq!(claims.token_type, AuthTokenType::Refresh);

        let stored = store.get_user(auth.user.id).unwrap();
        assert_ne!(stored.password_hash, "correct horse battery");
        assert!(stored.password_hash.starts_with("$argon2id$"));
    }

    #[actix_web::test]
    async fn test_sign_up_rejects_bad_input() {
        let store = test_utils::memory_store();
        let app = test::init_service(App::new().configure(test_utils::configure_app(store))).await;

        let bodies = [
            json!({ "name": "Avery", "email": "not-an-email", "password": "long enough" }),
            json!({ "name": "Avery", "email": "avery@example.com", "password": "short" }),
            json!({ "name": "  ", "email": "avery@example.com", "password": "long enough" }),
        ];

        for body in bodies {
            let req = TestRequest::post()
                .uri("/api/auth/signup")
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }

        test_utils::sign_up(&app, "Avery", "avery@example.com").await;

        let req = TestRequest::post()
            .uri("/api/auth/signup")
            .set_json(json!({
                "name": "Other",
                "email": "AVERY@example.com",
                "password": "another password",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ServerErrorResponse = test::read_body_json(resp).await;
        assert!(!body.success);
        assert_eq!(body.err_type, ErrorType::ConflictWithExisting);
    }

    #[actix_web::test]
    async fn test_log_in() {
        let store = test_utils::memory_store();
        let app = test::init_service(App::new().configure(test_utils::configure_app(store))).await;

        let signed_up = test_utils::sign_up(&app, "Avery", "avery@example.com").await;

        let req = TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "avery@example.com", "password": "correct horse battery" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: OutputEnvelope<OutputAuth> = test::read_body_json(resp).await;
        assert_eq!(body.data.user, signed_up.user);

        let wrong = [
            json!({ "email": "avery@example.com", "password": "incorrect horse" }),
            json!({ "email": "nobody@example.com", "password": "correct horse battery" }),
        ];

        for body in wrong {
            let req = TestRequest::post()
                .uri("/api/auth/login")
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        }

        let req = TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "", "password": "" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_log_in_unknown_email_checks_dummy_hash() {
        let dummy_hash = DUMMY_PASSWORD_HASH
            .as_deref()
            .expect("Dummy hash should be available");
        let dummy_hash = argon2_kdf::Hash::from_str(dummy_hash).unwrap();
        let secret = || argon2_kdf::Secret::using_bytes(&env::CONF.hashing_key[..]);

        assert!(dummy_hash.verify_with_secret(b"ledger-dummy-password", secret()));
        assert!(!dummy_hash.verify_with_secret(b"correct horse battery", secret()));

        let store = test_utils::memory_store();
        let app = test::init_service(App::new().configure(test_utils::configure_app(store))).await;

        // Matching the dummy hash must never authenticate a nonexistent user
        for password in ["ledger-dummy-password", "correct horse battery"] {
            let req = TestRequest::post()
                .uri("/api/auth/login")
                .set_json(json!({ "email": "nobody@example.com", "password": password }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

            let body: ServerErrorResponse = test::read_body_json(resp).await;
            assert_eq!(body.err_type, ErrorType::IncorrectCredential);
            assert_eq!(body.message, format!("Incorrect credential: {INCORRECT_CREDENTIALS_MSG}"));
        }
    }

    #[actix_web::test]
    async fn test_me_and_refresh() {
        let store = test_utils::memory_store();
        let app = test::init_service(App::new().configure(test_utils::configure_app(store))).await;

        let auth = test_utils::sign_up(&app, "Avery", "avery@example.com").await;

        let req = TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(bearer(&auth))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: OutputEnvelope<OutputUser> = test::read_body_json(resp).await;
        assert_eq!(body.data, auth.user);

        let req = TestRequest::get().uri("/api/auth/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        // Refresh token cannot be used as an access token
        let req = TestRequest::get()
            .uri("/api/auth/me")
            .insert_header((
                "Authorization",
                format!("Bearer {}", auth.tokens.refresh_token),
            ))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = TestRequest::post()
            .uri("/api/auth/token/refresh")
            .insert_header(("RefreshToken", auth.tokens.refresh_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: OutputEnvelope<OutputAuth> = test::read_body_json(resp).await;
        assert_eq!(body.data.user, auth.user);
        assert!(AuthToken::decode(&body.data.tokens.access_token)
            .unwrap()
            .verify(&env::CONF.token_signing_key[..])
            .is_ok());

        let req = TestRequest::post()
            .uri("/api/auth/token/refresh")
            .insert_header(("RefreshToken", auth.tokens.access_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
