use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, OnboardingRequest, PublicUser, RefreshRequest, RefreshResponse, RegisterRequest},
        extractors::AuthUser,
        repo_types::ProfilePatch,
    },
    error::{ApiError, Envelope},
    state::AppState,
};

type ApiResult<T> = Result<T, ApiError>;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh-token", post(refresh))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/profile", get(get_profile).put(update_profile))
        .route("/auth/logout", post(logout))
        .route("/auth/complete-onboarding", post(complete_onboarding))
}

/// An empty or `null` body reads as the request's defaults, so missing fields get the
/// operation's own validation message. Content-Type is not checked.
fn body<T: DeserializeOwned + Default>(state: &AppState, raw: &[u8]) -> ApiResult<T> {
    let debug = state.config.debug;
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let value: Value = serde_json::from_slice(raw).map_err(|e| ApiError::invalid_body(debug, e))?;
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|e| ApiError::invalid_body(debug, e))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Bytes,
) -> ApiResult<(StatusCode, Json<Envelope<AuthResponse>>)> {
    let req = body(&state, &payload)?;
    let res = state
        .auth()
        .register(req)
        .await
        .map_err(|e| ApiError::from_auth(e, state.config.debug))?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message("User registered successfully", res)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Bytes,
) -> ApiResult<Json<Envelope<AuthResponse>>> {
    let req = body(&state, &payload)?;
    let res = state
        .auth()
        .login(req)
        .await
        .map_err(|e| ApiError::from_auth(e, state.config.debug))?;
    Ok(Json(Envelope::with_message("Login successful", res)))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    payload: Bytes,
) -> ApiResult<Json<Envelope<RefreshResponse>>> {
    let req = body(&state, &payload)?;
    let res = state
        .auth()
        .refresh_token(req)
        .await
        .map_err(|e| ApiError::from_auth(e, state.config.debug))?;
    Ok(Json(Envelope::data(res)))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Envelope<PublicUser>>> {
    let user = state
        .auth()
        .get_profile(user_id)
        .await
        .map_err(|e| ApiError::from_auth(e, state.config.debug))?;
    Ok(Json(Envelope::data(user)))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Bytes,
) -> ApiResult<Json<Envelope<PublicUser>>> {
    let patch = body(&state, &payload)?;
    let user = state
        .auth()
        .update_profile(user_id, patch)
        .await
        .map_err(|e| ApiError::from_auth(e, state.config.debug))?;
    Ok(Json(Envelope::with_message("Profile updated successfully", user)))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Envelope<()>>> {
    state
        .auth()
        .logout(user_id)
        .await
        .map_err(|e| ApiError::from_auth(e, state.config.debug))?;
    Ok(Json(Envelope::message("Logged out successfully")))
}

#[instrument(skip(state, payload))]
pub async fn complete_onboarding(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Bytes,
) -> ApiResult<Json<Envelope<PublicUser>>> {
    let req = body(&state, &payload)?;
    let user = state
        .auth()
        .complete_onboarding(user_id, req)
        .await
        .map_err(|e| ApiError::from_auth(e, state.config.debug))?;
    Ok(Json(Envelope::with_message("Onboarding completed successfully", user)))
}
