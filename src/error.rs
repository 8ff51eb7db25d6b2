use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::auth::AuthError;
use crate::models::GatedMetric;
use crate::repositories::RepositoryError;

// Type alias for Result with our AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{} can be updated again at {next_update_at}", metric_label(.metric))]
    Cooldown {
        metric: GatedMetric,
        next_update_at: DateTime<Utc>,
        remaining: i64,
    },

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Upload exceeds the {0} byte limit")]
    PayloadTooLarge(usize),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

fn metric_label(metric: &GatedMetric) -> &'static str {
    match metric {
        GatedMetric::Bmi => "BMI",
        GatedMetric::Calories => "Calorie data",
    }
}

impl AppError {
    /// Map repository errors where a missing row means a missing `entity`
    pub fn from_repository(entity: &'static str) -> impl Fn(RepositoryError) -> AppError {
        move |err| match err {
            RepositoryError::NotFound => AppError::NotFound(entity),
            other => AppError::Repository(other),
        }
    }
}

// Extractor rejections surface as 400s with the same body shape as everything else
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(validation_message(&errors))
    }
}

/// Flatten validator output into one readable line, fields in stable order
pub fn validation_message(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(message) => message.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, error) = match self {
            // AuthError owns its own mapping
            AppError::Auth(inner) => return inner.into_response(),
            AppError::Cooldown {
                metric,
                next_update_at,
                remaining,
            } => {
                let unit = match metric {
                    GatedMetric::Bmi => "days_remaining",
                    GatedMetric::Calories => "hours_remaining",
                };
                let mut body = json!({
                    "error": "Update not allowed yet",
                    "message": message,
                    "metric": metric.as_str(),
                    "next_update_at": next_update_at,
                });
                body[unit] = json!(remaining);
                return (StatusCode::BAD_REQUEST, Json(body)).into_response();
            }
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation failed"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "Access denied"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
            AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large"),
            AppError::Repository(RepositoryError::NotFound) => (StatusCode::NOT_FOUND, "Not found"),
            AppError::Repository(RepositoryError::AlreadyExists) => {
                (StatusCode::BAD_REQUEST, "Already exists")
            }
            AppError::Repository(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let message = if status.is_server_error() {
            tracing::error!(error = %message, "request failed");
            "Something went wrong, please try again later".to_string()
        } else {
            message
        };

        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}
