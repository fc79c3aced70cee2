use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};

use crate::adapters::inbound::http::{
    dto::{ApiError, ErrorResponseDto},
    router::AppState,
};

/// The acting principal, read from the header configured on [`AppState`].
///
/// Authentication happens upstream; this only carries the username into commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let username = parts
            .headers
            .get(&state.principal_header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        match username {
            Some(username) => Ok(CurrentUser(username.to_string())),
            None => Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponseDto::unauthorized(&format!(
                    "Missing '{}' header",
                    state.principal_header
                ))),
            )),
        }
    }
}
