use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Envelope shared by every endpoint of both services.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub status: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::with_status(StatusCode::OK, data)
    }

    pub fn with_status(status: StatusCode, data: T) -> Self {
        Self {
            code: status.as_u16(),
            status: status_label(status).to_string(),
            data,
        }
    }
}

/// Short machine label carried in the envelope's `status` field.
pub fn status_label(status: StatusCode) -> &'static str {
    match status {
        StatusCode::OK => "SUCCESS",
        StatusCode::BAD_REQUEST => "BAD REQUEST",
        StatusCode::NOT_FOUND => "NOT FOUND",
        StatusCode::INTERNAL_SERVER_ERROR => "INTERNAL SERVER ERROR",
        _ => "ERROR",
    }
}
