
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kitchen_menu_api::{pdf::PdfError, MenuError, Unit};
use serde_json::json;

use super::data::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Validation(String),
    #[error("invalid unit")]
    InvalidUnit,
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Pdf(#[from] PdfError),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<MenuError> for ApiError {
    fn from(err: MenuError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("rejected json body: {}", rejection.body_text());
        match rejection {
            JsonRejection::JsonSyntaxError(_) => ApiError::validation("Malformed JSON"),
            JsonRejection::MissingJsonContentType(_) => ApiError::validation("Expected a JSON body"),
            _ => ApiError::validation("Invalid body"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" })),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::InvalidUnit => (StatusCode::BAD_REQUEST, json!({
                "error": "Invalid unit",
                "allowed": Unit::accepted(),
            })),
            ApiError::NotFound => (StatusCode::NOT_FOUND, json!({ "error": "Not found" })),
            ApiError::Store(err) => {
                tracing::error!("store failure: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal error" }))
            },
            ApiError::Pdf(err) => {
                tracing::error!("pdf failure: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal error" }))
            },
        };

        (status, Json(body)).into_response()
    }
}
