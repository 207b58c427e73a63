use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug)]
pub enum Error {
    SessionNotFound,
    SessionExpired,
    MissingSignature,
    InvalidSignature,
    TooManyGames,
    Store(redis::RedisError),
    Internal,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionNotFound => write!(f, "Game session not found"),
            Self::SessionExpired => write!(f, "Game session expired"),
            Self::MissingSignature => write!(f, "Missing session signature"),
            Self::InvalidSignature => write!(f, "Invalid session signature"),
            Self::TooManyGames => write!(f, "Too many new games, please try again later"),
            Self::Store(e) => write!(f, "Preference store error: {}", e),
            Self::Internal => write!(f, "Internal error"),
        }
    }
}

impl std::error::Error for Error {}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::Store(err)
    }
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::SessionNotFound => StatusCode::NOT_FOUND,
            Error::SessionExpired => StatusCode::GONE,
            Error::MissingSignature => StatusCode::UNAUTHORIZED,
            Error::InvalidSignature => StatusCode::FORBIDDEN,
            Error::TooManyGames => StatusCode::TOO_MANY_REQUESTS,
            Error::Store(_) | Error::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        // Store failures are logged, not leaked to the client.
        let message = match &self {
            Error::Store(e) => {
                tracing::error!("Preference store error: {}", e);
                "Storage error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
