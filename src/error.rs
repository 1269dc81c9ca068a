use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Client-correctable problem with one request field.
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    /// Unknown email and wrong password look the same from outside.
    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("{0}")]
    NotFound(&'static str),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(anyhow::Error::new(e))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation { field, message } => {
                let mut errors = serde_json::Map::new();
                errors.insert(field, json!([message]));
                (StatusCode::BAD_REQUEST, Json(errors)).into_response()
            }
            ApiError::AuthenticationFailed => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": INVALID_CREDENTIALS })),
            )
                .into_response(),
            ApiError::NotFound(what) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": what }))).into_response()
            }
            ApiError::MalformedBody(reason) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": reason }))).into_response()
            }
            ApiError::Internal(e) => {
                error!(error = ?e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::UniqueField;

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_error_is_keyed_by_field() {
        let res = ApiError::validation("email", "Email already registered").into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(res).await,
            json!({ "email": ["Email already registered"] })
        );
    }

    #[tokio::test]
    async fn authentication_failure_is_undifferentiated() {
        let res = ApiError::AuthenticationFailed.into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(res).await, json!({ "error": INVALID_CREDENTIALS }));
    }

    #[tokio::test]
    async fn not_found_maps_to_404() {
        let res = ApiError::NotFound("User not found").into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(res).await, json!({ "error": "User not found" }));
    }

    #[tokio::test]
    async fn store_errors_do_not_leak_details() {
        let err: ApiError = StoreError::Conflict(UniqueField::ReferralCode).into();
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(res).await, json!({ "error": "Internal server error" }));
    }
}
