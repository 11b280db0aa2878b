use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};
use tracing::warn;
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

/// Verified subject id taken from an `Authorization: Bearer <token>` header.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "No token provided"))?;

        match state.keys.verify(token) {
            Ok(claims) => Ok(AuthUser(claims.user_id)),
            Err(e) => {
                warn!(reason = %e, "bearer token rejected");
                Err(ApiError::new(StatusCode::UNAUTHORIZED, "Invalid or expired token")
                    .with_detail(state.config.debug, e))
            }
        }
    }
}

/// Scheme is matched case-insensitively; an empty credential counts as absent.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, rest) = header.split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    (!token.is_empty()).then_some(token)
}
