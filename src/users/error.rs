use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use super::{
    password::PasswordError,
    repo::StoreError,
    repo_types::UniqueField,
    validation::ValidationErrors,
};

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{0} is already taken")]
    UniquenessViolation(UniqueField),

    #[error("user not found")]
    NotFound,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("storage error: {0}")]
    Storage(#[source] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ValidationErrors> for UserError {
    fn from(e: ValidationErrors) -> Self {
        UserError::Validation(e)
    }
}

impl From<StoreError> for UserError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(field) => UserError::UniquenessViolation(field),
            StoreError::DuplicateId(id) => UserError::Internal(format!("user id {id} reused")),
            StoreError::NotFound => UserError::NotFound,
            StoreError::Database(e) => UserError::Storage(e),
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        match self {
            UserError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            UserError::UniquenessViolation(field) => {
                let message = match field {
                    UniqueField::Email => "Email is already registered",
                    UniqueField::Username => "Username is already taken",
                };
                (
                    StatusCode::CONFLICT,
                    Json(json!({ "errors": [{ "field": field, "message": message }] })),
                )
                    .into_response()
            }
            UserError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": "User not found" }))).into_response()
            }
            other => {
                error!(error = %other, "user request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
