use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(#[from] auth::AuthError),
    #[error("Invalid filter: {0}")]
    InvalidFilter(#[from] core_types::CoreError),
    #[error("Not signed in")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Auth(auth_err) => {
                let status = match &auth_err {
                    auth::AuthError::EmptyCredentials => StatusCode::BAD_REQUEST,
                    auth::AuthError::InvalidCredentials
                    | auth::AuthError::UnauthorizedDomain(_) => StatusCode::UNAUTHORIZED,
                    auth::AuthError::Locked { .. } => StatusCode::TOO_MANY_REQUESTS,
                    auth::AuthError::EntraDisabled => StatusCode::NOT_FOUND,
                    auth::AuthError::PasswordHash(_) => {
                        tracing::error!(error = ?auth_err, "Authentication error.");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, auth_err.to_string())
            }
            AppError::InvalidFilter(core_err) => (StatusCode::BAD_REQUEST, core_err.to_string()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "Your profile does not have access to this page".to_string(),
            ),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
