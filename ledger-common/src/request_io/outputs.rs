use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::User;

/// Success envelope wrapping every response body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub data: T,
}

impl<T> OutputEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            count: None,
            data,
        }
    }
}

impl<T> OutputEnvelope<Vec<T>> {
    pub fn counted(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: Some(data.len()),
            data,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputMessage {
    pub success: bool,
    pub message: String,
}

impl OutputMessage {
    pub fn new(message: &str) -> Self {
        Self {
            success: true,
            message: String::from(message),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputHealth {
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for OutputUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(rename = "token")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "serverTime")]
    pub server_time: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputAuth {
    pub user: OutputUser,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorType {
    IncorrectlyFormed,
    InvalidInput,
    ConflictWithExisting,
    IncorrectCredential,
    TokenExpired,
    TokenMissing,
    WrongTokenType,
    TooManyRequests,
    UserDoesNotExist,
    TransactionDoesNotExist,
    CategoryDoesNotExist,
    RouteDoesNotExist,
    InternalError,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerErrorResponse {
    pub success: bool,
    #[serde(rename = "errType")]
    pub err_type: ErrorType,
    pub message: String,
}

impl ServerErrorResponse {
    pub fn new(err_type: ErrorType, message: String) -> Self {
        Self {
            success: false,
            err_type,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_count_only_when_counted() {
        let single = serde_json::to_value(OutputEnvelope::new(5)).unwrap();
        assert_eq!(single, serde_json::json!({ "success": true, "data": 5 }));

        let list = serde_json::to_value(OutputEnvelope::counted(vec!["a", "b"])).unwrap();
        assert_eq!(
            list,
            serde_json::json!({ "success": true, "count": 2, "data": ["a", "b"] })
        );
    }

    #[test]
    fn test_auth_output_is_flat() {
        let output = OutputAuth {
            user: OutputUser {
                id: Uuid::nil(),
                name: String::from("Ada"),
                email: String::from("ada@example.com"),
            },
            tokens: TokenPair {
                access_token: String::from("access"),
                refresh_token: String::from("refresh"),
                server_time: 1,
            },
        };

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["token"], "access");
        assert_eq!(json["refreshToken"], "refresh");
        assert_eq!(json["user"]["email"], "ada@example.com");
    }

    #[test]
    fn test_error_response_shape() {
        let resp = ServerErrorResponse::new(
            ErrorType::TransactionDoesNotExist,
            String::from("Transaction not found"),
        );

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["errType"], "transactionDoesNotExist");
        assert_eq!(json["message"], "Transaction not found");
    }
}
