//! HTTP-facing error type shared by every handler.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

use crate::db::StoreError;
use crate::media::MediaError;

/// Message returned for every failure the client cannot act on.
pub const SERVER_ERROR: &str = "Server error";

/// One entry of a `{ "errors": [...] }` validation response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    pub msg: String,
    pub location: String,
}

impl FieldError {
    pub fn body(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            kind: "field".to_string(),
            path: path.into(),
            msg: msg.into(),
            location: "body".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub errors: Vec<FieldError>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {0:?}")]
    Validation(Vec<FieldError>),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Map an extractor rejection, keeping the size-limit status.
    pub fn rejected(status: StatusCode, text: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(text)
        } else {
            AppError::BadRequest(text)
        }
    }
}

/// Flatten validator output into client-facing entries, ordered by field.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| {
                let msg = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Invalid value".to_string());
                FieldError::body(field.to_string(), msg)
            })
        })
        .collect();
    fields.sort_by(|a, b| a.path.cmp(&b.path));
    fields
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(field_errors(&errors))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(ValidationResponse { errors })).into_response()
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, MessageResponse::new(msg)).into_response()
            }
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, MessageResponse::new(msg)).into_response()
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, MessageResponse::new(msg)).into_response()
            }
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, MessageResponse::new(msg)).into_response()
            }
            AppError::Store(err) => {
                tracing::error!(error = %err, "store error");
                server_error()
            }
            AppError::Media(err) => {
                tracing::error!(error = %err, "image host error");
                server_error()
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                server_error()
            }
        }
    }
}

fn server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        MessageResponse::new(SERVER_ERROR),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::ValidationError;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn store_errors_hide_details() {
        let response = AppError::Internal("connection reset".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], SERVER_ERROR);
    }

    #[tokio::test]
    async fn validation_errors_are_listed_by_field() {
        let mut errors = ValidationErrors::new();
        errors.add("title", ValidationError::new("length"));
        errors.add("author", ValidationError::new("length"));

        let response = AppError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: ValidationResponse =
            serde_json::from_value(body_json(response).await).unwrap();
        let paths: Vec<_> = body.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["author", "title"]);
        assert!(body.errors.iter().all(|e| e.msg == "Invalid value"));
    }
}
