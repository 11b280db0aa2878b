use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{decode_sequence, ProfilePatch, UserRow};

/// Request body for user registration.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default, deserialize_with = "scalar_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub phone: Option<String>,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "scalar_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub password: Option<String>,
}

/// Request body for token refresh.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default, deserialize_with = "scalar_text")]
    pub refresh_token: Option<String>,
}

/// Numbers and booleans are taken as their text so they reach field validation
/// (`{"email": 5}` is an invalid email, not a malformed body). Null, arrays and
/// objects count as not supplied.
fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Some(v.to_string()),
        _ => None,
    })
}

/// Request body for onboarding completion. Absent or null entries leave the stored value alone.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRequest {
    #[serde(default, deserialize_with = "scalar_text")]
    pub first_name: Option<String>,
    pub selected_causes: Option<Vec<Value>>,
    pub followed_organizations: Option<Vec<Value>>,
    pub notification_preferences: Option<NotificationPreferences>,
}

/// Loosely typed: any JSON value is accepted and coerced with [`truthy`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub push_notifications: Option<Value>,
    pub email_notifications: Option<Value>,
    pub organization_updates: Option<Value>,
    pub cause_alerts: Option<Value>,
}

impl OnboardingRequest {
    pub fn into_patch(self) -> ProfilePatch {
        let prefs = self.notification_preferences.unwrap_or_default();
        ProfilePatch {
            first_name: self.first_name.map(Some),
            selected_causes: self.selected_causes.map(Some),
            followed_organizations: self.followed_organizations.map(Some),
            push_notifications: prefs.push_notifications.as_ref().map(truthy),
            email_notifications: prefs.email_notifications.as_ref().map(truthy),
            organization_updates: prefs.organization_updates.as_ref().map(truthy),
            cause_alerts: prefs.cause_alerts.as_ref().map(truthy),
            onboarding_completed: Some(true),
            ..Default::default()
        }
    }
}

/// Loose boolean coercion: `false`, `0`, `""`, `"0"`, `[]`, `{}` and `null` are false.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Response returned after login or register.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

/// Response returned after a refresh exchange. The refresh token is not rotated.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Redacted user returned to the client. Has no slot for the password hash,
/// refresh token or password-reset fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub selected_causes: Vec<Value>,
    pub followed_organizations: Vec<Value>,
    pub push_notifications: bool,
    pub email_notifications: bool,
    pub organization_updates: bool,
    pub cause_alerts: bool,
    pub onboarding_completed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login_at: Option<OffsetDateTime>,
}

impl From<UserRow> for PublicUser {
    fn from(r: UserRow) -> Self {
        Self {
            selected_causes: decode_sequence(r.selected_causes.as_deref()),
            followed_organizations: decode_sequence(r.followed_organizations.as_deref()),
            id: r.id,
            email: r.email,
            first_name: r.first_name,
            last_name: r.last_name,
            phone: r.phone,
            email_verified: r.email_verified,
            phone_verified: r.phone_verified,
            profile_picture: r.profile_picture,
            bio: r.bio,
            location: r.location,
            city: r.city,
            state: r.state,
            zip_code: r.zip_code,
            push_notifications: r.push_notifications,
            email_notifications: r.email_notifications,
            organization_updates: r.organization_updates,
            cause_alerts: r.cause_alerts,
            onboarding_completed: r.onboarding_completed,
            created_at: r.created_at,
            updated_at: r.updated_at,
            last_login_at: r.last_login_at,
        }
    }
}
