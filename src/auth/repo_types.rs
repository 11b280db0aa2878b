use serde::{Deserialize, Deserializer};
use serde_json::Value;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::dto::truthy;

/// User record as stored. Never serialized directly; see `dto::PublicUser`.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String, // Argon2 PHC string
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
    pub selected_causes: Option<String>,        // JSON array text
    pub followed_organizations: Option<String>, // JSON array text
    pub push_notifications: bool,
    pub email_notifications: bool,
    pub organization_updates: bool,
    pub cause_alerts: bool,
    pub onboarding_completed: bool,
    pub refresh_token: Option<String>,
    pub password_reset_token: Option<String>,
    pub password_reset_expires: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub last_login_at: Option<OffsetDateTime>,
}

/// Fields supplied at registration. Everything else takes its column default.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

/// Partial profile update.
///
/// Outer `None` leaves the stored value untouched. For nullable columns the inner
/// `None` (a JSON `null`) clears it. `id`, `email`, `password` and the refresh token
/// have no slot here and therefore cannot be changed through this path.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(default, deserialize_with = "nullable")]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub state: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub zip_code: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub profile_picture: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub selected_causes: Option<Option<Vec<Value>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub followed_organizations: Option<Option<Vec<Value>>>,
    #[serde(default, deserialize_with = "loose_flag")]
    pub push_notifications: Option<bool>,
    #[serde(default, deserialize_with = "loose_flag")]
    pub email_notifications: Option<bool>,
    #[serde(default, deserialize_with = "loose_flag")]
    pub organization_updates: Option<bool>,
    #[serde(default, deserialize_with = "loose_flag")]
    pub cause_alerts: Option<bool>,
    /// Only the onboarding operation sets this.
    #[serde(skip)]
    pub onboarding_completed: Option<bool>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Any non-null value is coerced with [`truthy`]; null leaves the flag untouched.
fn loose_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.as_ref().map(truthy))
}

/// JSON text for a sequence column.
pub(crate) fn encode_sequence(values: &Option<Vec<Value>>) -> anyhow::Result<Option<String>> {
    Ok(match values {
        Some(v) => Some(serde_json::to_string(v)?),
        None => None,
    })
}

/// Absent, null or undecodable sequence columns read back as empty.
pub(crate) fn decode_sequence(raw: Option<&str>) -> Vec<Value> {
    match raw {
        Some(text) => match serde_json::from_str::<Option<Vec<Value>>>(text) {
            Ok(v) => v.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "stored sequence is not a JSON array");
                Vec::new()
            }
        },
        None => Vec::new(),
    }
}
