pub mod auth;
pub mod budget;
pub mod category;
pub mod health;
pub mod transaction;

pub mod error {
    use ledger_common::ledger::{LedgerError, Resource};
    use ledger_common::request_io::{ErrorType, ServerErrorResponse};
    use ledger_common::token::TokenError;
    use ledger_common::validators::ValidationError;

    use actix_web::http::StatusCode;
    use actix_web::{HttpResponse, HttpResponseBuilder};
    use std::fmt;
    use tokio::sync::oneshot;

    #[derive(Debug)]
    pub enum DoesNotExistType {
        User,
        Transaction,
        Category,
        Route,
    }

    impl From<Resource> for DoesNotExistType {
        fn from(resource: Resource) -> Self {
            match resource {
                Resource::User => DoesNotExistType::User,
                Resource::Transaction => DoesNotExistType::Transaction,
                Resource::Category => DoesNotExistType::Category,
            }
        }
    }

    #[derive(Debug)]
    pub enum HttpErrorResponse {
        // 400
        IncorrectlyFormed(String),
        InvalidInput(String),
        ConflictWithExisting(String),

        // 401
        IncorrectCredential(String),
        BadToken(String),
        TokenExpired(String),
        TokenMissing(String),
        WrongTokenType(String),

        // 404
        DoesNotExist(String, DoesNotExistType),

        // 429
        TooManyRequests(String),

        // 500
        InternalError(String),
    }

    impl std::error::Error for HttpErrorResponse {}

    impl fmt::Display for HttpErrorResponse {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let server_error: ServerErrorResponse = self.into();
            write!(f, "{:?}", server_error)
        }
    }

    impl From<HttpErrorResponse> for ServerErrorResponse {
        fn from(resp: HttpErrorResponse) -> Self {
            (&resp).into()
        }
    }

    impl From<&HttpErrorResponse> for ServerErrorResponse {
        fn from(resp: &HttpErrorResponse) -> Self {
            match resp {
                // 400
                HttpErrorResponse::IncorrectlyFormed(msg) => ServerErrorResponse::new(
                    ErrorType::IncorrectlyFormed,
                    format!("Incorrectly formed request: {msg}"),
                ),
                HttpErrorResponse::InvalidInput(msg) => {
                    ServerErrorResponse::new(ErrorType::InvalidInput, format!("Invalid input: {msg}"))
                }
                HttpErrorResponse::ConflictWithExisting(msg) => ServerErrorResponse::new(
                    ErrorType::ConflictWithExisting,
                    format!("Conflict with existing data: {msg}"),
                ),

                // 401
                HttpErrorResponse::IncorrectCredential(msg) => ServerErrorResponse::new(
                    ErrorType::IncorrectCredential,
                    format!("Incorrect credential: {msg}"),
                ),
                HttpErrorResponse::BadToken(msg) => ServerErrorResponse::new(
                    ErrorType::IncorrectCredential,
                    format!("Bad token: {msg}"),
                ),
                HttpErrorResponse::TokenExpired(msg) => {
                    ServerErrorResponse::new(ErrorType::TokenExpired, format!("Token expired: {msg}"))
                }
                HttpErrorResponse::TokenMissing(msg) => {
                    ServerErrorResponse::new(ErrorType::TokenMissing, format!("Token missing: {msg}"))
                }
                HttpErrorResponse::WrongTokenType(msg) => ServerErrorResponse::new(
                    ErrorType::WrongTokenType,
                    format!("Wrong token type: {msg}"),
                ),

                // 404
                HttpErrorResponse::DoesNotExist(msg, dne_type) => ServerErrorResponse::new(
                    match dne_type {
                        DoesNotExistType::User => ErrorType::UserDoesNotExist,
                        DoesNotExistType::Transaction => ErrorType::TransactionDoesNotExist,
                        DoesNotExistType::Category => ErrorType::CategoryDoesNotExist,
                        DoesNotExistType::Route => ErrorType::RouteDoesNotExist,
                    },
                    format!("Does not exist: {msg}"),
                ),

                // 429
                HttpErrorResponse::TooManyRequests(msg) => ServerErrorResponse::new(
                    ErrorType::TooManyRequests,
                    format!("Too many requests: {msg}"),
                ),

                // 500
                HttpErrorResponse::InternalError(msg) => ServerErrorResponse::new(
                    ErrorType::InternalError,
                    format!("Internal error: {msg}"),
                ),
            }
        }
    }

    impl actix_web::error::ResponseError for HttpErrorResponse {
        fn error_response(&self) -> HttpResponse {
            HttpResponseBuilder::new(self.status_code()).json(ServerErrorResponse::from(self))
        }

        fn status_code(&self) -> StatusCode {
            match *self {
                HttpErrorResponse::IncorrectlyFormed(_)
                | HttpErrorResponse::InvalidInput(_)
                | HttpErrorResponse::ConflictWithExisting(_) => StatusCode::BAD_REQUEST,
                HttpErrorResponse::IncorrectCredential(_)
                | HttpErrorResponse::BadToken(_)
                | HttpErrorResponse::TokenExpired(_)
                | HttpErrorResponse::TokenMissing(_)
                | HttpErrorResponse::WrongTokenType(_) => StatusCode::UNAUTHORIZED,
                HttpErrorResponse::DoesNotExist(_, _) => StatusCode::NOT_FOUND,
                HttpErrorResponse::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
                HttpErrorResponse::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl From<actix_web::error::BlockingError> for HttpErrorResponse {
        fn from(_err: actix_web::error::BlockingError) -> Self {
            HttpErrorResponse::InternalError(String::from("Actix thread pool failure"))
        }
    }

    impl From<oneshot::error::RecvError> for HttpErrorResponse {
        fn from(_err: oneshot::error::RecvError) -> Self {
            HttpErrorResponse::InternalError(String::from("Rayon thread pool failure"))
        }
    }

    impl From<ValidationError> for HttpErrorResponse {
        fn from(err: ValidationError) -> Self {
            HttpErrorResponse::InvalidInput(err.to_string())
        }
    }

    impl From<LedgerError> for HttpErrorResponse {
        fn from(err: LedgerError) -> Self {
            match err {
                LedgerError::Validation(e) => e.into(),
                LedgerError::NotFound(resource) => HttpErrorResponse::DoesNotExist(
                    format!("{resource} not found"),
                    resource.into(),
                ),
                LedgerError::Conflict(msg) => {
                    HttpErrorResponse::ConflictWithExisting(msg.into_owned())
                }
                LedgerError::Store(e) => {
                    log::error!("{e}");
                    HttpErrorResponse::InternalError(String::from("Failed to access ledger data"))
                }
            }
        }
    }

    impl From<TokenError> for HttpErrorResponse {
        fn from(err: TokenError) -> Self {
            match err {
                TokenError::TokenInvalid => {
                    HttpErrorResponse::BadToken(String::from("Invalid token"))
                }
                TokenError::TokenExpired => {
                    HttpErrorResponse::TokenExpired(String::from("Token expired"))
                }
                TokenError::TokenMissing => {
                    HttpErrorResponse::TokenMissing(String::from("Not authorized"))
                }
                TokenError::WrongTokenType => {
                    HttpErrorResponse::WrongTokenType(String::from("Wrong token type"))
                }
                TokenError::SigningFailed => {
                    log::error!("Failed to sign token");
                    HttpErrorResponse::InternalError(String::from("Failed to generate token"))
                }
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        use actix_web::body::to_bytes;
        use actix_web::ResponseError;
        use ledger_common::db::DaoError;

        #[test]
        fn test_ledger_error_status_codes() {
            let cases = [
                (
                    LedgerError::Validation(ValidationError::MissingField("amount")),
                    StatusCode::BAD_REQUEST,
                ),
                (
                    LedgerError::NotFound(Resource::Transaction),
                    StatusCode::NOT_FOUND,
                ),
                (
                    LedgerError::Conflict("duplicate".into()),
                    StatusCode::BAD_REQUEST,
                ),
                (
                    LedgerError::Store(DaoError::not_found()),
                    StatusCode::INTERNAL_SERVER_ERROR,
                ),
            ];

            for (err, status) in cases {
                assert_eq!(HttpErrorResponse::from(err).status_code(), status);
            }

            assert_eq!(
                HttpErrorResponse::from(TokenError::WrongTokenType).status_code(),
                StatusCode::UNAUTHORIZED
            );
            assert_eq!(
                HttpErrorResponse::from(TokenError::SigningFailed).status_code(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }

        #[actix_web::test]
        async fn test_error_body_is_json_envelope() {
            let err = HttpErrorResponse::from(LedgerError::NotFound(Resource::Category));
            let resp = err.error_response();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);

            let body = to_bytes(resp.into_body()).await.unwrap();
            let body: serde_json::Value = serde_json::from_slice(&body).unwrap();

            assert_eq!(body["success"], false);
            assert_eq!(body["errType"], "categoryDoesNotExist");
            assert_eq!(body["message"], "Does not exist: Category not found");
        }
    }
}

#[cfg(test)]
pub mod test_utils {
    use ledger_common::db::{CategoryStore, MemoryStore, Store};
    use ledger_common::request_io::{OutputAuth, OutputEnvelope};

    use actix_http::Request;
    use actix_web::body::MessageBody;
    use actix_web::dev::{Service, ServiceResponse};
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::web::{Data, ServiceConfig};
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Arc;

    use crate::services::api::RouteLimiters;

    pub fn memory_store() -> Data<dyn Store> {
        let store = MemoryStore::new();
        store.seed_default_categories(Utc::now()).unwrap();

        let store: Arc<dyn Store> = Arc::new(store);
        Data::from(store)
    }

    pub fn configure_app(store: Data<dyn Store>) -> impl FnOnce(&mut ServiceConfig) {
        move |cfg| {
            cfg.app_data(store);
            crate::services::api::configure(cfg, RouteLimiters::default());
        }
    }

    pub async fn sign_up<S, B>(app: &S, name: &str, email: &str) -> OutputAuth
    where
        S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
        B: MessageBody,
    {
        let req = TestRequest::post()
            .uri("/api/auth/signup")
            .set_json(json!({
                "name": name,
                "email": email,
                "password": "correct horse battery",
            }))
            .to_request();

        let resp = test::call_service(app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: OutputEnvelope<OutputAuth> = test::read_body_json(resp).await;
        body.data
    }

    pub fn bearer(auth: &OutputAuth) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", auth.tokens.access_token))
    }
}
