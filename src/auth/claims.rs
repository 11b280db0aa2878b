use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token payload. Access and refresh tokens share this shape and differ only in lifetime.
/// `jti` keeps two tokens issued in the same second for the same user distinct.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Uuid, // subject
    pub email: String,
    pub iat: usize, // issued at (unix timestamp)
    pub exp: usize, // expires at (unix timestamp)
    pub jti: Uuid, // unique per issued token
}
