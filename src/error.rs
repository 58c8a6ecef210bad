use axum::{
    extract::{FromRequest, FromRequestParts, rejection::JsonRejection, rejection::PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::response::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("payment already finalized")]
    AlreadyFinalized,

    #[error("payment amount {amount} does not match order total amount {total}")]
    AmountMismatch { amount: i64, total: i64 },

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Decode(String),

    /// The order side answered a settlement callback with a client error.
    #[error("callback failed with status {status}: {body}")]
    CallbackRejected { status: u16, body: String },

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_)
            | AppError::Conflict(_)
            | AppError::AlreadyFinalized
            | AppError::AmountMismatch { .. }
            | AppError::Upstream(_)
            | AppError::Decode(_)
            | AppError::CallbackRejected { .. } => StatusCode::BAD_REQUEST,
            AppError::OrmError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::OrmError(err) => {
                tracing::error!(error = %err, "database failure");
                "internal server error".to_string()
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "unexpected failure");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, axum::Json(ApiResponse::with_status(status, message))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// JSON body extractor whose rejections render as the validation envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Path extractor whose rejections render as the validation envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(_: PathRejection) -> Self {
        AppError::Validation("invalid UUID".into())
    }
}
