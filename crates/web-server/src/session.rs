use crate::{error::AppError, AppState};
use auth::User;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "painel_session";

/// The signed-in user. Rejects the request with 401 without a live session
/// or when the cookie signature does not verify.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session_id = state
            .cookie_jar(&parts.headers)
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .ok_or(AppError::Unauthorized)?;

        state
            .auth
            .session(&session_id)
            .map(CurrentUser)
            .ok_or(AppError::Unauthorized)
    }
}
