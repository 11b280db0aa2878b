use std::time::Duration;

use anyhow::Context;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{auth::claims::Claims, config::JwtConfig};

/// Why a presented token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid token format")]
    Format,
    #[error("Invalid signature")]
    Signature,
    #[error("Token expired")]
    Expired,
}

/// HS256 signing material plus token lifetimes, built once at startup from [`JwtConfig`].
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenKeys {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;

        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            access_ttl: minutes(config.ttl_minutes),
            refresh_ttl: minutes(config.refresh_ttl_minutes),
        }
    }

    pub fn sign_access(&self, user_id: Uuid, email: &str) -> anyhow::Result<String> {
        self.issue(user_id, email, self.access_ttl)
    }

    pub fn sign_refresh(&self, user_id: Uuid, email: &str) -> anyhow::Result<String> {
        self.issue(user_id, email, self.refresh_ttl)
    }

    pub fn issue(&self, user_id: Uuid, email: &str, lifetime: Duration) -> anyhow::Result<String> {
        self.issue_at(user_id, email, OffsetDateTime::now_utc(), lifetime)
    }

    pub(crate) fn issue_at(
        &self,
        user_id: Uuid,
        email: &str,
        issued_at: OffsetDateTime,
        lifetime: Duration,
    ) -> anyhow::Result<String> {
        let exp = i64::try_from(lifetime.as_secs())
            .ok()
            .and_then(|secs| issued_at.checked_add(TimeDuration::seconds(secs)))
            .context("token lifetime out of range")?;
        let claims = Claims {
            user_id,
            email: email.to_owned(),
            iat: issued_at.unix_timestamp().max(0) as usize,
            exp: exp.unix_timestamp().max(0) as usize,
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id = %user_id, ttl_secs = lifetime.as_secs(), "token signed");
        Ok(token)
    }

    /// Checks shape, then signature, then expiry. A correctly signed but stale token
    /// always reports [`TokenError::Expired`].
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        if token.split('.').count() != 3 {
            return Err(TokenError::Format);
        }

        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidToken => TokenError::Format,
                _ => TokenError::Signature,
            }
        })?;
        debug!(user_id = %data.claims.user_id, "token verified");
        Ok(data.claims)
    }
}

fn minutes(n: i64) -> Duration {
    Duration::from_secs(u64::try_from(n).unwrap_or(0).saturating_mul(60))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str) -> TokenKeys {
        TokenKeys::new(&JwtConfig {
            secret: secret.into(),
            ttl_minutes: 60,
            refresh_ttl_minutes: 60 * 24 * 7,
        })
    }

    #[test]
    fn sign_and_verify_access_token() {
        let keys = make_keys("dev-secret");
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id, "a@b.com").expect("sign access");
        assert_eq!(token.split('.').count(), 3);

        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn refresh_token_lives_seven_days() {
        let keys = make_keys("dev-secret");
        let token = keys.sign_refresh(Uuid::new_v4(), "a@b.com").expect("sign refresh");
        let claims = keys.verify(&token).expect("verify refresh");
        assert_eq!(claims.exp - claims.iat, 604_800);
    }

    #[test]
    fn tokens_issued_back_to_back_differ() {
        let keys = make_keys("dev-secret");
        let user_id = Uuid::new_v4();
        let first = keys.sign_refresh(user_id, "a@b.com").unwrap();
        let second = keys.sign_refresh(user_id, "a@b.com").unwrap();
        assert_ne!(first, second);

        let (a, b) = (keys.verify(&first).unwrap(), keys.verify(&second).unwrap());
        assert_eq!(a.user_id, b.user_id);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn oversized_lifetime_fails_instead_of_panicking() {
        let keys = TokenKeys::new(&JwtConfig {
            secret: "dev-secret".into(),
            ttl_minutes: i64::MAX,
            refresh_ttl_minutes: -5,
        });
        assert_eq!(keys.refresh_ttl, Duration::ZERO);
        assert!(keys.sign_access(Uuid::new_v4(), "a@b.com").is_err());
    }

    #[test]
    fn wrong_segment_count_is_format_error() {
        let keys = make_keys("dev-secret");
        assert_eq!(keys.verify("abc").unwrap_err(), TokenError::Format);
        assert_eq!(keys.verify("a.b").unwrap_err(), TokenError::Format);
        assert_eq!(keys.verify("a.b.c.d").unwrap_err(), TokenError::Format);
        assert_eq!(keys.verify("").unwrap_err(), TokenError::Format);
    }

    #[test]
    fn other_secret_is_signature_error() {
        let token = make_keys("one").sign_access(Uuid::new_v4(), "a@b.com").unwrap();
        assert_eq!(make_keys("two").verify(&token).unwrap_err(), TokenError::Signature);
    }

    #[test]
    fn expired_token_reports_expiry_not_signature() {
        let keys = make_keys("dev-secret");
        let two_hours_ago = OffsetDateTime::now_utc() - TimeDuration::hours(2);
        let token = keys
            .issue_at(Uuid::new_v4(), "a@b.com", two_hours_ago, Duration::from_secs(3600))
            .unwrap();
        assert_eq!(keys.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn any_bit_flip_in_signature_is_rejected() {
        let keys = make_keys("dev-secret");
        let token = keys.sign_access(Uuid::new_v4(), "a@b.com").unwrap();
        let sig_start = token.rfind('.').unwrap() + 1;

        for pos in sig_start..token.len() {
            for bit in 0..8 {
                let mut bytes = token.clone().into_bytes();
                bytes[pos] ^= 1 << bit;
                let Ok(mutated) = String::from_utf8(bytes) else {
                    continue;
                };
                assert!(
                    keys.verify(&mutated).is_err(),
                    "mutation at {pos} bit {bit} was accepted"
                );
            }
        }
    }

    #[test]
    fn tampered_payload_is_signature_error() {
        let keys = make_keys("dev-secret");
        let token = keys.sign_access(Uuid::new_v4(), "a@b.com").unwrap();
        let other = keys.sign_access(Uuid::new_v4(), "a@b.com").unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);
        assert_eq!(keys.verify(&forged).unwrap_err(), TokenError::Signature);
    }
}
