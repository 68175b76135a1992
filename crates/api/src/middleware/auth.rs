//! Authentication extractors for route handlers.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};

use crate::error::set_sentry_user;
use crate::state::AppState;
use crate::tokens::SessionClaims;

/// Extractor that requires a valid session token.
///
/// Reads the `Authorization` header as a bearer token and verifies it
/// against the application's token signer.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     CurrentUser(user): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct CurrentUser(pub SessionClaims);

/// Error returned when a session token is required but missing or invalid.
#[derive(Debug)]
pub enum AuthRejection {
    /// No bearer token present on the request.
    MissingToken,
    /// A token was presented but failed verification.
    InvalidToken,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let message = match self {
            Self::MissingToken => "No token provided",
            Self::InvalidToken => "Invalid token",
        };
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": message })),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split_whitespace().nth(1))
            .ok_or(AuthRejection::MissingToken)?;

        let claims = state
            .tokens()
            .verify_session(token)
            .map_err(|_| AuthRejection::InvalidToken)?;

        set_sentry_user(claims.sub.as_i32(), Some(&claims.email));

        Ok(Self(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_are_unauthorized() {
        let missing = AuthRejection::MissingToken.into_response();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let invalid = AuthRejection::InvalidToken.into_response();
        assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);
    }
}
