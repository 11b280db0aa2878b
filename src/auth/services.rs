use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{
    dto::{AuthResponse, LoginRequest, OnboardingRequest, PublicUser, RefreshRequest, RefreshResponse, RegisterRequest},
    jwt::{TokenError, TokenKeys},
    password::{hash_password, verify_password},
    repo::CredentialStore,
    repo_types::{NewUser, ProfilePatch, UserRow},
};

/// Domain failures of the auth operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("Invalid token")]
    Token(#[from] TokenError),
    #[error("{0}")]
    NotFound(String),
    /// Storage and hashing failures.
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(
            r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$"
        )
        .unwrap();
    }
    let Some((local, _)) = email.split_once('@') else {
        return false;
    };
    local.len() <= 64
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && EMAIL_RE.is_match(email)
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Registration, login, profile and token operations over a [`CredentialStore`].
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    keys: TokenKeys,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, keys: TokenKeys) -> Self {
        Self { store, keys }
    }

    pub fn keys(&self) -> &TokenKeys {
        &self.keys
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let (Some(email), Some(password)) = (required(req.email), required(req.password)) else {
            return Err(AuthError::Validation("Email and password are required".into()));
        };

        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AuthError::Validation("Invalid email format".into()));
        }

        if self.store.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AuthError::Conflict("User already exists".into()));
        }

        let password_hash = hash_password(&password)?;
        let id = self
            .store
            .create(NewUser {
                email,
                password_hash,
                first_name: req.first_name,
                last_name: req.last_name,
                phone: req.phone,
            })
            .await?;

        // Re-read so the response carries the defaults storage applied.
        let user = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user {id} missing right after insert"))?;

        let response = self.open_session(user).await?;
        info!(user_id = %id, email = %response.user.email, "user registered");
        Ok(response)
    }

    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AuthError> {
        let (Some(email), Some(password)) = (required(req.email), required(req.password)) else {
            return Err(AuthError::Validation("Email and password are required".into()));
        };

        let Some(user) = self.store.find_by_email(&email).await? else {
            warn!(email = %email, "login unknown email");
            return Err(AuthError::Unauthorized(INVALID_CREDENTIALS.into()));
        };

        if !verify_password(&password, &user.password_hash) {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AuthError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        self.store.update_last_login(user.id).await?;
        let user = self.store.find_by_id(user.id).await?.unwrap_or(user);

        let response = self.open_session(user).await?;
        info!(user_id = %response.user.id, "user logged in");
        Ok(response)
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<PublicUser, AuthError> {
        Ok(self.require_user(user_id).await?.into())
    }

    /// Applies the patch as given; protected columns have no slot in [`ProfilePatch`].
    pub async fn update_profile(&self, user_id: Uuid, patch: ProfilePatch) -> Result<PublicUser, AuthError> {
        self.require_user(user_id).await?;
        self.store.update_profile(user_id, &patch).await?;
        let user = self.require_user(user_id).await?;
        info!(user_id = %user_id, "profile updated");
        Ok(user.into())
    }

    /// Issues a new access token when `refresh_token` equals the one currently stored
    /// for its subject. The refresh token itself is kept.
    pub async fn refresh_token(&self, req: RefreshRequest) -> Result<RefreshResponse, AuthError> {
        let Some(token) = required(req.refresh_token) else {
            return Err(AuthError::Validation("Refresh token required".into()));
        };

        let claims = self.keys.verify(&token).map_err(|e| {
            warn!(reason = %e, "refresh token rejected");
            AuthError::from(e)
        })?;

        let user = match self.store.find_by_id(claims.user_id).await? {
            Some(u) if u.refresh_token.as_deref() == Some(token.as_str()) => u,
            _ => {
                warn!(user_id = %claims.user_id, "refresh token not current");
                return Err(AuthError::Unauthorized("Invalid refresh token".into()));
            }
        };

        let access_token = self.keys.sign_access(user.id, &user.email)?;
        Ok(RefreshResponse { access_token })
    }

    /// Idempotent.
    pub async fn logout(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.store.update_refresh_token(user_id, None).await?;
        info!(user_id = %user_id, "user logged out");
        Ok(())
    }

    pub async fn complete_onboarding(&self, user_id: Uuid, req: OnboardingRequest) -> Result<PublicUser, AuthError> {
        self.require_user(user_id).await?;
        self.store.update_profile(user_id, &req.into_patch()).await?;
        let user = self.require_user(user_id).await?;
        info!(user_id = %user_id, "onboarding completed");
        Ok(user.into())
    }

    async fn require_user(&self, user_id: Uuid) -> Result<UserRow, AuthError> {
        self.store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".into()))
    }

    /// Issues an access/refresh pair and makes the refresh token the only valid one.
    async fn open_session(&self, user: UserRow) -> Result<AuthResponse, AuthError> {
        let access_token = self.keys.sign_access(user.id, &user.email)?;
        let refresh_token = self.keys.sign_refresh(user.id, &user.email)?;
        self.store
            .update_refresh_token(user.id, Some(&refresh_token))
            .await?;

        Ok(AuthResponse {
            user: user.into(),
            access_token,
            refresh_token,
        })
    }
}
