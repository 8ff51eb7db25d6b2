use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::repositories::RepositoryError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Membership expired on {0}")]
    MembershipExpired(String),
    #[error("User not found")]
    UserNotFound,
    #[error("{0} already registered")]
    UserAlreadyExists(&'static str),
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Missing authorization header")]
    MissingAuthHeader,
    #[error("Invalid authorization header format")]
    InvalidAuthHeaderFormat,
    #[error("Insufficient permissions")]
    InsufficientPermissions,
    #[error("Password validation failed: {0}")]
    PasswordValidation(String),
    #[error("{0}")]
    Validation(String),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("Password hashing error: {0}")]
    PasswordHashing(#[from] crate::auth::password::PasswordError),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeaderFormat
            | AuthError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AuthError::MembershipExpired(_) | AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::UserNotFound | AuthError::Repository(RepositoryError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            AuthError::UserAlreadyExists(_)
            | AuthError::PasswordValidation(_)
            | AuthError::Validation(_)
            | AuthError::Repository(RepositoryError::AlreadyExists) => StatusCode::BAD_REQUEST,
            AuthError::Repository(_) | AuthError::PasswordHashing(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match &self {
            AuthError::InvalidCredentials => "Invalid credentials",
            AuthError::MembershipExpired(_) => "Membership expired",
            AuthError::UserNotFound => "User not found",
            AuthError::UserAlreadyExists(_) => "User already exists",
            AuthError::InvalidToken => "Invalid token",
            AuthError::TokenExpired => "Token expired",
            AuthError::MissingAuthHeader => "Missing authorization header",
            AuthError::InvalidAuthHeaderFormat => "Invalid authorization header format",
            AuthError::InsufficientPermissions => "Insufficient permissions",
            AuthError::PasswordValidation(_) => "Password validation failed",
            AuthError::Validation(_) => "Validation failed",
            AuthError::Repository(RepositoryError::NotFound) => "Not found",
            AuthError::Repository(RepositoryError::AlreadyExists) => "User already exists",
            AuthError::Repository(_) => "Database error",
            AuthError::Jwt(_) => "Token error",
            AuthError::PasswordHashing(_) => "Password processing error",
            AuthError::Internal(_) => "Internal server error",
        };

        // Detail for server-side failures stays in the logs
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "auth request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": error_message,
            "message": message,
        }));

        (status, body).into_response()
    }
}
