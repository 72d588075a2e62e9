use crate::db::errors::DbError;
use crate::types::Credits;
use axum::{
    extract::multipart::MultipartRejection,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// No valid session on the request
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Missing or malformed request fields
    #[error("{message}")]
    Validation { message: String },

    /// Balance does not cover the cost of the request
    #[error("Insufficient credits: needed {needed}, available {available}")]
    InsufficientCredits { needed: Credits, available: Credits },

    /// The inference provider failed or returned unusable data
    #[error("Inference provider error: {message}")]
    Provider { message: String },

    /// Missing record or a record owned by another account; deliberately one variant
    #[error("Not found")]
    NotFoundOrUnauthorized,

    #[error("Payload too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("Unsupported media type: {content_type}")]
    UnsupportedMediaType { content_type: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
            Error::Provider { .. } => StatusCode::BAD_GATEWAY,
            Error::NotFoundOrUnauthorized => StatusCode::NOT_FOUND,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } | DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code included in every error body
    pub fn code(&self) -> &'static str {
        match self {
            Error::Unauthenticated { .. } => "unauthorized",
            Error::Validation { .. } => "validation_error",
            Error::InsufficientCredits { .. } => "insufficient_credits",
            Error::Provider { .. } => "provider_error",
            Error::NotFoundOrUnauthorized | Error::Database(DbError::NotFound) => "not_found",
            Error::PayloadTooLarge { .. } => "payload_too_large",
            Error::UnsupportedMediaType { .. } => "unsupported_media_type",
            Error::Database(DbError::UniqueViolation { .. }) => "conflict",
            Error::Database(DbError::ForeignKeyViolation { .. } | DbError::CheckViolation { .. }) => "invalid_data",
            Error::Internal { .. } | Error::Database(DbError::Other(_)) | Error::Other(_) => "internal_error",
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::Validation { message } => message.clone(),
            Error::InsufficientCredits { needed, available } => {
                format!("Insufficient credits: this request needs {needed} but only {available} remain")
            }
            Error::Provider { .. } => "Failed to generate speech".to_string(),
            Error::NotFoundOrUnauthorized => "Resource not found".to_string(),
            Error::PayloadTooLarge { limit } => format!("File exceeds the {limit} byte limit"),
            Error::UnsupportedMediaType { content_type } => format!("Expected an audio file, got {content_type}"),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { .. } => "Resource already exists".to_string(),
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

// Extractor rejections are client input errors and render like any other validation failure

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Validation {
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::Validation {
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartRejection> for Error {
    fn from(rejection: MultipartRejection) -> Self {
        Error::Validation {
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Provider { .. } => {
                tracing::warn!("{}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::Validation { .. }
            | Error::InsufficientCredits { .. }
            | Error::NotFoundOrUnauthorized
            | Error::PayloadTooLarge { .. }
            | Error::UnsupportedMediaType { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        let mut body = json!({
            "success": false,
            "error": self.user_message(),
            "code": self.code(),
        });
        if let Error::InsufficientCredits { needed, available } = &self {
            body["needed"] = json!(needed);
            body["available"] = json!(available);
        }

        (status, Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
